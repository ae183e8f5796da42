/*!
 * Processing of a single claimed job.
 */

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use tokio::time::Instant;

use super::{JobOutcome, Worker};
use crate::database::{ItemRecord, JobRecord, JobStatus};
use crate::export::render_export;
use crate::translation::{translate_with_retry, ItemOutcome, TranslationRequest};

impl Worker {
    /// Run a job this worker has just claimed through to a terminal status
    ///
    /// Store and export errors are returned as-is; the job then stays in
    /// progress and becomes claimable again once the lease goes stale.
    pub(super) async fn run_claimed(&self, job: &JobRecord) -> Result<JobOutcome> {
        info!(
            "Worker {} processing job {} ({})",
            self.worker_id, job.id, job.target_language
        );

        let items = self.store.list_items(&job.id).await?;
        if items.is_empty() {
            warn!("Job {} has no items, marking it failed", job.id);
            self.store.set_job_status(&job.id, JobStatus::Failed, None).await?;
            return Ok(JobOutcome {
                job_id: job.id.clone(),
                status: JobStatus::Failed,
                translated: 0,
                fallback: 0,
                resumed: 0,
                download_url: None,
            });
        }

        let (done, pending): (Vec<ItemRecord>, Vec<ItemRecord>) =
            items.into_iter().partition(ItemRecord::is_translated);
        if !done.is_empty() {
            info!(
                "Job {}: resuming, {} item(s) already translated",
                job.id,
                done.len()
            );
        }

        let fallbacks = self.translate_items(job, pending).await?;
        let fallback = fallbacks.iter().filter(|is_fallback| **is_fallback).count();
        let translated = fallbacks.len() - fallback;

        let download_url = self.export(job).await?;

        if !self
            .store
            .set_job_status(&job.id, JobStatus::Completed, Some(&download_url))
            .await?
        {
            return Err(anyhow!("Job {} could not be marked completed", job.id));
        }

        let outcome = JobOutcome {
            job_id: job.id.clone(),
            status: JobStatus::Completed,
            translated,
            fallback,
            resumed: done.len(),
            download_url: Some(download_url),
        };
        if fallback > 0 {
            warn!("Completed with fallbacks: {}", outcome);
        } else {
            info!("Completed: {}", outcome);
        }
        Ok(outcome)
    }

    /// Translate and persist every pending item, bounded by `concurrency`
    ///
    /// Returns each item's fallback flag. The first store error or lost lease
    /// stops the stream, so no further items are translated.
    async fn translate_items(&self, job: &JobRecord, pending: Vec<ItemRecord>) -> Result<Vec<bool>> {
        let deadline = self.config.job_deadline().map(|d| Instant::now() + d);
        let policy = self.config.retry_policy();
        let total = pending.len();

        stream::iter(pending.into_iter().enumerate())
            .map(|(index, item)| {
                let policy = &policy;
                async move {
                    let outcome = if deadline.is_some_and(|at| Instant::now() >= at) {
                        ItemOutcome::Fallback {
                            reason: "job deadline exceeded".to_string(),
                        }
                    } else {
                        let request = TranslationRequest::from_item(&item, &job.target_language);
                        translate_with_retry(self.translator.as_ref(), &request, policy, &self.pacer).await
                    };

                    if let ItemOutcome::Fallback { reason } = &outcome {
                        warn!(
                            "Item {}/{} '{}' falls back to the keyword: {}",
                            index + 1,
                            total,
                            item.keyword,
                            reason
                        );
                    } else {
                        debug!("Item {}/{} '{}' translated", index + 1, total, item.keyword);
                    }

                    self.persist(job, &item, outcome).await
                }
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .try_collect()
            .await
    }

    /// Renew the job lease, then store an item's outcome
    ///
    /// Nothing is written once the lease belongs to another worker.
    async fn persist(&self, job: &JobRecord, item: &ItemRecord, outcome: ItemOutcome) -> Result<bool> {
        let is_fallback = outcome.is_fallback();
        let pair = outcome.into_variants(&item.keyword);

        if !self.store.renew_claim(&job.id, &self.worker_id).await? {
            return Err(anyhow!(
                "Worker {} lost the lease on job {}",
                self.worker_id,
                job.id
            ));
        }

        let updated = self
            .store
            .update_item_translation(&item.id, &pair.first, &pair.second, is_fallback)
            .await
            .with_context(|| format!("Failed to store translation of item {}", item.id))?;
        if !updated {
            return Err(anyhow!("Item {} of job {} no longer exists", item.id, job.id));
        }

        Ok(is_fallback)
    }

    /// Render the job's items in stored order and publish them
    async fn export(&self, job: &JobRecord) -> Result<String> {
        let items = self.store.list_items(&job.id).await?;

        if let Some(item) = items.iter().find(|i| !i.is_translated()) {
            return Err(anyhow!(
                "Job {} still has an untranslated item {}, not exporting",
                job.id,
                item.id
            ));
        }

        let bytes = render_export(&items, self.export_format)?;
        self.sink
            .publish(&job.id, self.export_format, bytes)
            .await
            .with_context(|| format!("Failed to publish export for job {}", job.id))
    }
}
