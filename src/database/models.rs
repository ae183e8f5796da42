/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to the `jobs` and `items` tables and provide
 * type-safe access to persisted pipeline state.
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format a timestamp with fixed precision so stored values sort lexicographically
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Job status enumeration
///
/// Transitions only move forward: `Queued -> InProgress -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted and waiting for a worker
    Queued,
    /// Claimed by a worker
    InProgress,
    /// Every item attempted and the export published
    Completed,
    /// No processable items
    Failed,
}

impl JobStatus {
    /// Position in the forward-only lifecycle; both terminal states share a rank
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::InProgress => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` respects the lifecycle
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::InProgress => write!(f, "in_progress"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "in_progress" | "running" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "failed" | "error" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Translation job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier (UUID)
    pub id: String,
    /// Target language name (e.g. "French")
    pub target_language: String,
    /// Current job status
    pub status: JobStatus,
    /// Submission timestamp (RFC 3339)
    pub submitted_at: String,
    /// Reference to the published export, set on completion
    pub download_url: Option<String>,
    /// Whether all items of the submission have been stored
    pub sealed: bool,
    /// Worker currently holding the lease
    pub claimed_by: Option<String>,
    /// Last time the lease was taken or renewed (RFC 3339)
    pub claimed_at: Option<String>,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
    /// Completion timestamp (RFC 3339), if finished
    pub completed_at: Option<String>,
}

impl JobRecord {
    /// Create a new queued, unsealed job
    pub fn new(id: String, target_language: String) -> Self {
        let now = format_timestamp(Utc::now());
        Self {
            id,
            target_language,
            status: JobStatus::Queued,
            submitted_at: now.clone(),
            download_url: None,
            sealed: false,
            claimed_by: None,
            claimed_at: None,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// A keyword row supplied by a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    /// Caller-generated identifier; re-inserting the same id is a no-op
    pub id: String,
    /// Source text to translate
    pub keyword: String,
    /// Optional category
    pub category: Option<String>,
    /// Optional subcategory
    pub subcategory: Option<String>,
    /// Optional product category
    pub product_category: Option<String>,
}

impl NewItem {
    /// Create a keyword row with a fresh id and no metadata
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            keyword: keyword.into(),
            category: None,
            subcategory: None,
            product_category: None,
        }
    }

    /// Set the category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = non_empty(category.into());
        self
    }

    /// Set the subcategory
    pub fn subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = non_empty(subcategory.into());
        self
    }

    /// Set the product category
    pub fn product_category(mut self, product_category: impl Into<String>) -> Self {
        self.product_category = non_empty(product_category.into());
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Stored keyword item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item identifier
    pub id: String,
    /// Owning job
    pub job_id: String,
    /// Insertion order across the store
    pub position: i64,
    /// Source text
    pub keyword: String,
    /// Optional category
    pub category: Option<String>,
    /// Optional subcategory
    pub subcategory: Option<String>,
    /// Optional product category
    pub product_category: Option<String>,
    /// First translated variant
    pub translated_variant_1: Option<String>,
    /// Second translated variant
    pub translated_variant_2: Option<String>,
    /// Whether the variants are the untranslated keyword
    pub is_fallback: bool,
}

impl ItemRecord {
    /// Whether both variants are present and non-empty
    pub fn is_translated(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        filled(&self.translated_variant_1) && filled(&self.translated_variant_2)
    }
}

/// Counts reported by `JobStore::stats`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    /// Jobs waiting for a worker
    pub queued_jobs: i64,
    /// Jobs currently claimed
    pub in_progress_jobs: i64,
    /// Completed jobs
    pub completed_jobs: i64,
    /// Failed jobs
    pub failed_jobs: i64,
    /// Items across all jobs
    pub total_items: i64,
    /// Items with both variants set
    pub translated_items: i64,
    /// Items that fell back to the keyword
    pub fallback_items: i64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Jobs: {} queued, {} in progress, {} completed, {} failed | Items: {}/{} translated ({} fallback)",
            self.queued_jobs,
            self.in_progress_jobs,
            self.completed_jobs,
            self.failed_jobs,
            self.translated_items,
            self.total_items,
            self.fallback_items
        )
    }
}
