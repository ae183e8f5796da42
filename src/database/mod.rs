/*!
 * Job store persistence.
 *
 * This module provides SQLite-based persistence for:
 * - Translation jobs with a forward-only status lifecycle and worker leases
 * - Keyword items and their translated variants
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{ItemRecord, JobRecord, JobStatus, NewItem, StoreStats};
pub use repository::JobStore;
