/*!
 * Translation worker.
 *
 * A `Worker` claims sealed queued jobs from the `JobStore`, translates every
 * item through the injected `Translator` with retry, fallback and pacing,
 * publishes the export through the injected `ExportSink`, and finalizes the
 * job. Per-job processing lives in `processor`.
 */

use anyhow::Result;
use log::{debug, error, info, warn};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::WorkerConfig;
use crate::database::{JobStatus, JobStore};
use crate::errors::JobError;
use crate::export::{ExportFormat, ExportSink};
use crate::translation::{Pacer, Translator};

mod processor;

/// Result of processing one claimed job
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Job identifier
    pub job_id: String,
    /// Final status written by the worker
    pub status: JobStatus,
    /// Items translated by the model in this run
    pub translated: usize,
    /// Items that fell back to their keyword in this run
    pub fallback: usize,
    /// Items that already carried variants from an earlier run
    pub resumed: usize,
    /// Export reference, for completed jobs
    pub download_url: Option<String>,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} {}: {} translated, {} fallback, {} resumed",
            self.job_id, self.status, self.translated, self.fallback, self.resumed
        )
    }
}

/// Summary of one pass over all claimable jobs
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrainReport {
    /// Jobs this worker claimed and finalized
    pub outcomes: Vec<JobOutcome>,
    /// Jobs another worker claimed first
    pub lost_claims: usize,
    /// Jobs aborted by a store or export error, left in progress
    pub aborted: usize,
}

impl DrainReport {
    /// Number of jobs finalized in this pass
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }
}

/// Job-processing worker with explicit dependencies
pub struct Worker {
    store: JobStore,
    translator: Arc<dyn Translator>,
    sink: Arc<dyn ExportSink>,
    config: WorkerConfig,
    export_format: ExportFormat,
    worker_id: String,
    pacer: Pacer,
}

impl Worker {
    /// Create a worker; the pacer is shared by every call this worker makes
    pub fn new(
        store: JobStore,
        translator: Arc<dyn Translator>,
        sink: Arc<dyn ExportSink>,
        config: WorkerConfig,
    ) -> Self {
        let worker_id = format!("worker-{}", uuid::Uuid::new_v4().simple());
        let pacer = Pacer::new(config.request_delay());
        Self {
            store,
            translator,
            sink,
            config,
            export_format: ExportFormat::default(),
            worker_id,
            pacer,
        }
    }

    /// Set the export format
    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    /// Override the generated worker id
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Claim and process every currently claimable job, oldest first
    pub async fn drain(&self) -> Result<DrainReport> {
        let jobs = self.store.claimable_jobs(self.config.stale_after()).await?;
        let mut report = DrainReport::default();

        if jobs.is_empty() {
            debug!("No claimable jobs");
            return Ok(report);
        }
        info!("Found {} claimable job(s)", jobs.len());

        for job in jobs {
            if !self
                .store
                .claim_job(&job.id, &self.worker_id, self.config.stale_after())
                .await?
            {
                debug!("Job {} was claimed by another worker", job.id);
                report.lost_claims += 1;
                continue;
            }

            match self.run_claimed(&job).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    error!("Job {} aborted, left in progress: {:#}", job.id, e);
                    report.aborted += 1;
                }
            }
        }

        Ok(report)
    }

    /// Process one specific job, which must be queued and sealed
    ///
    /// Jobs in any other state are left untouched and reported as
    /// `JobError::NotClaimable`.
    pub async fn process_job(&self, job_id: &str) -> Result<JobOutcome> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if job.status != JobStatus::Queued || !job.sealed {
            return Err(JobError::NotClaimable {
                job_id: job.id,
                status: job.status,
            }
            .into());
        }

        if !self
            .store
            .claim_job(&job.id, &self.worker_id, self.config.stale_after())
            .await?
        {
            let status = self
                .store
                .get_job(job_id)
                .await?
                .map(|j| j.status)
                .unwrap_or(JobStatus::InProgress);
            return Err(JobError::NotClaimable {
                job_id: job.id,
                status,
            }
            .into());
        }

        self.run_claimed(&job).await
    }

    /// Drain repeatedly until `shutdown` resolves
    ///
    /// Shutdown is observed between passes; a job in flight is finished first.
    pub async fn watch<F>(&self, poll_interval: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Worker {} watching for jobs every {}s",
            self.worker_id,
            poll_interval.as_secs()
        );

        loop {
            match self.drain().await {
                Ok(report) if report.processed() > 0 || report.aborted > 0 => {
                    info!(
                        "Pass finished: {} processed, {} aborted, {} lost to other workers",
                        report.processed(),
                        report.aborted,
                        report.lost_claims
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("Drain failed: {:#}", e),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, worker {} stopping", self.worker_id);
                    return Ok(());
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
}
