//! Storage trait and error types
//!
//! The crawl pipeline only ever talks to this trait; the SQLite backend
//! is one implementation of it.

use crate::state::CrawlStatus;
use crate::storage::{AnalysisRecord, BrokenLinkRecord, CrawlItem};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: CrawlStatus,
        to: CrawlStatus,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store is the single source of truth for item status. Transition
/// legality is enforced here so no caller can skip `running` or revive a
/// terminal item without an explicit rerun reset.
pub trait Storage {
    // ===== Item Management =====

    /// Inserts a new item in `queued` status and returns it
    fn create_item(&mut self, url: &str) -> StorageResult<CrawlItem>;

    /// Gets an item by ID
    fn get_item(&self, id: i64) -> StorageResult<CrawlItem>;

    /// Gets all items, most recently created first
    fn list_items(&self) -> StorageResult<Vec<CrawlItem>>;

    /// Gets all items in `queued` status, oldest first
    ///
    /// The scheduler offers items to the work queue in this order.
    fn list_queued(&self) -> StorageResult<Vec<CrawlItem>>;

    /// Deletes an item and all of its analysis artifacts
    fn delete_item(&mut self, id: i64) -> StorageResult<()>;

    // ===== Lifecycle Transitions =====

    /// Transitions an item to a new status, writing the timestamps the
    /// transition owns
    ///
    /// * entering `running` sets `started_at`
    /// * entering `completed` or `failed` sets `completed_at`
    /// * `error_message` is stored only when entering `failed`
    ///
    /// Returns `StorageError::InvalidTransition` for illegal transitions.
    fn set_status(
        &mut self,
        id: i64,
        status: CrawlStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Atomically resets an item for a rerun
    ///
    /// Sets status back to `queued`, clears `started_at`, `completed_at`
    /// and `error_message`, and deletes any prior analysis result and
    /// broken link records, all in one transaction.
    fn reset_for_rerun(&mut self, id: i64) -> StorageResult<()>;

    // ===== Analysis Results =====

    /// Persists the analysis result and broken links for an item
    ///
    /// Transactional: replaces any prior artifacts so a save never
    /// interleaves with a concurrent rerun reset half-applied.
    fn save_analysis(
        &mut self,
        id: i64,
        analysis: &AnalysisRecord,
        broken_links: &[BrokenLinkRecord],
    ) -> StorageResult<()>;

    /// Gets the analysis result for an item, if one exists
    fn get_analysis(&self, id: i64) -> StorageResult<Option<AnalysisRecord>>;

    /// Gets all broken link records for an item
    fn get_broken_links(&self, id: i64) -> StorageResult<Vec<BrokenLinkRecord>>;

    // ===== Statistics =====

    /// Counts items by status
    fn count_by_status(&self, status: CrawlStatus) -> StorageResult<u64>;
}
