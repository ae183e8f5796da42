/*!
 * Job store: the repository layer over the `jobs` and `items` tables.
 *
 * This module provides a high-level API for all pipeline persistence,
 * abstracting away the SQL details and providing type-safe access.
 * Status changes are forward-only and the queued -> in_progress claim is a
 * single conditional UPDATE, so only one worker can win it.
 */

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Duration;

use super::connection::DatabaseConnection;
use super::models::{
    format_timestamp, ItemRecord, JobRecord, JobStatus, NewItem, StoreStats,
};
use crate::errors::JobError;

const JOB_COLUMNS: &str = "id, target_language, status, submitted_at, download_url, \
     sealed, claimed_by, claimed_at, updated_at, completed_at";

const ITEM_COLUMNS: &str = "id, job_id, position, keyword, category, subcategory, \
     product_category, translated_variant_1, translated_variant_2, is_fallback";

/// SQL expression ranking the stored status the same way as `JobStatus::rank`
const STATUS_RANK_SQL: &str =
    "CASE status WHEN 'queued' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END";

fn parse_job_row(row: &Row) -> rusqlite::Result<JobRecord> {
    let status: String = row.get(2)?;
    let status = status.parse::<JobStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(JobRecord {
        id: row.get(0)?,
        target_language: row.get(1)?,
        status,
        submitted_at: row.get(3)?,
        download_url: row.get(4)?,
        sealed: row.get(5)?,
        claimed_by: row.get(6)?,
        claimed_at: row.get(7)?,
        updated_at: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

fn parse_item_row(row: &Row) -> rusqlite::Result<ItemRecord> {
    Ok(ItemRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        position: row.get(2)?,
        keyword: row.get(3)?,
        category: row.get(4)?,
        subcategory: row.get(5)?,
        product_category: row.get(6)?,
        translated_variant_1: row.get(7)?,
        translated_variant_2: row.get(8)?,
        is_fallback: row.get(9)?,
    })
}

fn stale_cutoff(stale_after: Duration) -> Result<String> {
    let window = chrono::Duration::from_std(stale_after)
        .context("Lease staleness window is out of range")?;
    Ok(format_timestamp(Utc::now() - window))
}

fn reject_blank_keywords(rows: &[NewItem]) -> Result<()> {
    match rows.iter().find(|row| row.keyword.trim().is_empty()) {
        Some(row) => Err(JobError::BlankKeyword(row.id.clone()).into()),
        None => Ok(()),
    }
}

/// Durable store for jobs and their keyword items
#[derive(Clone)]
pub struct JobStore {
    /// Database connection
    db: DatabaseConnection,
}

impl JobStore {
    /// Create a new store with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open the store at the given path, or the default location when `None`
    pub fn open(path: Option<&std::path::Path>) -> Result<Self> {
        let db = match path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        Ok(Self::new(db))
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Create a new queued job with a fresh id
    pub async fn create_job(&self, target_language: &str) -> Result<JobRecord> {
        self.create_job_with_id(&uuid::Uuid::new_v4().to_string(), target_language)
            .await
    }

    /// Create a job under a caller-supplied id
    ///
    /// Retrying with the same id returns the job created by the first attempt.
    pub async fn create_job_with_id(&self, job_id: &str, target_language: &str) -> Result<JobRecord> {
        let job = JobRecord::new(job_id.to_string(), target_language.to_string());

        self.db
            .execute_async(move |conn| {
                let inserted = conn.execute(
                    r#"
                    INSERT OR IGNORE INTO jobs (id, target_language, status, submitted_at, sealed, updated_at)
                    VALUES (?1, ?2, ?3, ?4, 0, ?5)
                    "#,
                    params![
                        job.id,
                        job.target_language,
                        job.status.to_string(),
                        job.submitted_at,
                        job.updated_at,
                    ],
                )?;

                if inserted == 0 {
                    debug!("Job {} already exists, reusing it", job.id);
                }

                Self::get_job_sync(conn, &job.id)?
                    .ok_or_else(|| anyhow::anyhow!("Job {} vanished after insert", job.id))
            })
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_job_sync(conn, &job_id))
            .await
    }

    /// Get a job by ID (synchronous version for use within transactions)
    fn get_job_sync(conn: &Connection, job_id: &str) -> Result<Option<JobRecord>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
        let job = conn.query_row(&sql, [job_id], parse_job_row).optional()?;
        Ok(job)
    }

    /// Mark a submission complete so workers may claim the job
    pub async fn seal_job(&self, job_id: &str) -> Result<bool> {
        let job_id = job_id.to_string();
        let now = format_timestamp(Utc::now());

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE jobs SET sealed = 1, updated_at = ?1 WHERE id = ?2 AND status = 'queued'",
                    params![now, job_id],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    /// Create a job, append all rows in chunks, then seal it
    pub async fn submit_job(
        &self,
        target_language: &str,
        rows: Vec<NewItem>,
        chunk_size: usize,
    ) -> Result<JobRecord> {
        reject_blank_keywords(&rows)?;
        let job = self.create_job(target_language).await?;
        let row_count = rows.len();

        self.add_items(&job.id, rows, chunk_size).await?;
        self.seal_job(&job.id).await?;

        info!(
            "Submitted job {} with {} keywords for {}",
            job.id, row_count, target_language
        );

        self.get_job(&job.id)
            .await?
            .ok_or_else(|| JobError::NotFound(job.id.clone()).into())
    }

    /// List jobs, newest submission first, optionally filtered by status
    pub async fn list_jobs(&self, status_filter: Option<JobStatus>) -> Result<Vec<JobRecord>> {
        self.db
            .execute_async(move |conn| {
                let jobs: Vec<JobRecord> = if let Some(status) = status_filter {
                    let sql = format!(
                        "SELECT {} FROM jobs WHERE status = ?1 ORDER BY submitted_at DESC, rowid DESC",
                        JOB_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map([status.to_string()], parse_job_row)?;
                    rows.collect::<rusqlite::Result<_>>()?
                } else {
                    let sql = format!(
                        "SELECT {} FROM jobs ORDER BY submitted_at DESC, rowid DESC",
                        JOB_COLUMNS
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map([], parse_job_row)?;
                    rows.collect::<rusqlite::Result<_>>()?
                };

                Ok(jobs)
            })
            .await
    }

    /// Jobs a worker may claim: sealed queued jobs and in-progress jobs with a stale lease
    pub async fn claimable_jobs(&self, stale_after: Duration) -> Result<Vec<JobRecord>> {
        let cutoff = stale_cutoff(stale_after)?;

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    SELECT {} FROM jobs
                    WHERE sealed = 1
                      AND (status = 'queued'
                           OR (status = 'in_progress' AND (claimed_at IS NULL OR claimed_at < ?1)))
                    ORDER BY submitted_at ASC, rowid ASC
                    "#,
                    JOB_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([cutoff], parse_job_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Atomically take the lease on a job
    ///
    /// Succeeds for a sealed queued job, or for an in-progress job whose lease
    /// is older than `stale_after`. Returns `false` when another worker holds it.
    pub async fn claim_job(&self, job_id: &str, worker_id: &str, stale_after: Duration) -> Result<bool> {
        let job_id = job_id.to_string();
        let worker_id = worker_id.to_string();
        let now = format_timestamp(Utc::now());
        let cutoff = stale_cutoff(stale_after)?;

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE jobs
                    SET status = 'in_progress', claimed_by = ?1, claimed_at = ?2, updated_at = ?2
                    WHERE id = ?3
                      AND sealed = 1
                      AND (status = 'queued'
                           OR (status = 'in_progress' AND (claimed_at IS NULL OR claimed_at < ?4)))
                    "#,
                    params![worker_id, now, job_id, cutoff],
                )?;

                if changed == 1 {
                    debug!("Worker {} claimed job {}", worker_id, job_id);
                }
                Ok(changed == 1)
            })
            .await
    }

    /// Refresh the lease timestamp while a worker is still processing
    pub async fn renew_claim(&self, job_id: &str, worker_id: &str) -> Result<bool> {
        let job_id = job_id.to_string();
        let worker_id = worker_id.to_string();
        let now = format_timestamp(Utc::now());

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE jobs SET claimed_at = ?1, updated_at = ?1
                    WHERE id = ?2 AND claimed_by = ?3 AND status = 'in_progress'
                    "#,
                    params![now, job_id, worker_id],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    /// Move a job forward in its lifecycle
    ///
    /// Backward or terminal-to-terminal moves are ignored and return `false`.
    /// The artifact reference is only stored on the transition into `Completed`.
    pub async fn set_job_status(
        &self,
        job_id: &str,
        status: JobStatus,
        artifact_ref: Option<&str>,
    ) -> Result<bool> {
        let job_id = job_id.to_string();
        let artifact_ref = artifact_ref.map(str::to_string);
        let now = format_timestamp(Utc::now());

        self.db
            .execute_async(move |conn| {
                let download_url = if status == JobStatus::Completed {
                    artifact_ref
                } else {
                    None
                };
                let completed_at = status.is_terminal().then(|| now.clone());

                let sql = format!(
                    r#"
                    UPDATE jobs
                    SET status = ?1,
                        updated_at = ?2,
                        download_url = COALESCE(?3, download_url),
                        completed_at = COALESCE(?4, completed_at)
                    WHERE id = ?5 AND {} < ?6
                    "#,
                    STATUS_RANK_SQL
                );
                let changed = conn.execute(
                    &sql,
                    params![
                        status.to_string(),
                        now,
                        download_url,
                        completed_at,
                        job_id,
                        status.rank(),
                    ],
                )?;

                if changed == 0 {
                    warn!("Ignored status change of job {} to {}", job_id, status);
                }
                Ok(changed == 1)
            })
            .await
    }

    /// Delete a job and all of its items in one transaction
    pub async fn delete_job(&self, job_id: &str) -> Result<bool> {
        let job_id = job_id.to_string();

        self.db
            .transaction_async(move |tx| {
                let items = tx.execute("DELETE FROM items WHERE job_id = ?1", [&job_id])?;
                let jobs = tx.execute("DELETE FROM jobs WHERE id = ?1", [&job_id])?;
                debug!("Deleted job {} ({} items)", job_id, items);
                Ok(jobs == 1)
            })
            .await
    }

    // =========================================================================
    // Item Operations
    // =========================================================================

    /// Append keyword rows to a queued, unsealed job
    ///
    /// Rows are written in chunks of `chunk_size`, one transaction per chunk.
    /// Rows whose id is already stored are skipped, so a retried submission
    /// never duplicates items. Returns the number of rows actually inserted.
    /// Nothing is written when any row has a blank keyword.
    pub async fn add_items(&self, job_id: &str, rows: Vec<NewItem>, chunk_size: usize) -> Result<usize> {
        reject_blank_keywords(&rows)?;
        let chunk_size = chunk_size.max(1);
        let total_chunks = rows.len().div_ceil(chunk_size);
        let mut inserted = 0;

        for (index, chunk) in rows.chunks(chunk_size).enumerate() {
            let chunk = chunk.to_vec();
            let job_id = job_id.to_string();

            let written = self
                .db
                .transaction_async(move |tx| {
                    let state: Option<(String, bool)> = tx
                        .query_row(
                            "SELECT status, sealed FROM jobs WHERE id = ?1",
                            [&job_id],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?;

                    match state {
                        None => return Err(JobError::NotFound(job_id).into()),
                        Some((status, sealed)) if status != "queued" || sealed => {
                            return Err(JobError::Closed(job_id).into());
                        }
                        Some(_) => {}
                    }

                    let mut stmt = tx.prepare(
                        r#"
                        INSERT OR IGNORE INTO items (id, job_id, keyword, category, subcategory, product_category)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        "#,
                    )?;

                    let mut written = 0;
                    for row in &chunk {
                        written += stmt.execute(params![
                            row.id,
                            job_id,
                            row.keyword,
                            row.category,
                            row.subcategory,
                            row.product_category,
                        ])?;
                    }
                    Ok(written)
                })
                .await
                .with_context(|| format!("Failed to store chunk {}/{}", index + 1, total_chunks))?;

            debug!("Stored chunk {}/{} ({} new rows)", index + 1, total_chunks, written);
            inserted += written;
        }

        Ok(inserted)
    }

    /// Get all items of a job in insertion order
    pub async fn list_items(&self, job_id: &str) -> Result<Vec<ItemRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    "SELECT {} FROM items WHERE job_id = ?1 ORDER BY position",
                    ITEM_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([&job_id], parse_item_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await
    }

    /// Store both variants of an item; the last write wins
    pub async fn update_item_translation(
        &self,
        item_id: &str,
        variant_1: &str,
        variant_2: &str,
        is_fallback: bool,
    ) -> Result<bool> {
        let item_id = item_id.to_string();
        let variant_1 = variant_1.to_string();
        let variant_2 = variant_2.to_string();

        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE items
                    SET translated_variant_1 = ?1, translated_variant_2 = ?2, is_fallback = ?3
                    WHERE id = ?4
                    "#,
                    params![variant_1, variant_2, is_fallback, item_id],
                )?;
                Ok(changed == 1)
            })
            .await
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Job and item counts across the store
    pub async fn stats(&self) -> Result<StoreStats> {
        self.db
            .execute_async(|conn| {
                let mut stats = StoreStats::default();

                let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
                let counts = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
                for entry in counts {
                    let (status, count) = entry?;
                    match status.parse::<JobStatus>() {
                        Ok(JobStatus::Queued) => stats.queued_jobs = count,
                        Ok(JobStatus::InProgress) => stats.in_progress_jobs = count,
                        Ok(JobStatus::Completed) => stats.completed_jobs = count,
                        Ok(JobStatus::Failed) => stats.failed_jobs = count,
                        Err(e) => warn!("Skipping unknown job status in stats: {}", e),
                    }
                }

                let (total, translated, fallback): (i64, i64, i64) = conn.query_row(
                    r#"
                    SELECT COUNT(*),
                           COALESCE(SUM(translated_variant_1 IS NOT NULL), 0),
                           COALESCE(SUM(is_fallback), 0)
                    FROM items
                    "#,
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;
                stats.total_items = total;
                stats.translated_items = translated;
                stats.fallback_items = fallback;

                Ok(stats)
            })
            .await
    }
}
