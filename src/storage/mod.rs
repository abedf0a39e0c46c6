//! Storage module for persisting crawl items and analysis results
//!
//! This module handles all database operations for the pipeline:
//! - SQLite database initialization and schema management
//! - Crawl item lifecycle persistence (status + transition timestamps)
//! - Analysis result and broken link storage
//! - Atomic rerun resets

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::CrawlStatus;

/// One URL under management, with its lifecycle status and timestamps
///
/// Timestamps are RFC 3339 strings set exclusively by state transitions:
/// `started_at` when the item enters `running`, `completed_at` when it
/// reaches a terminal status, `error_message` only on `failed`.
#[derive(Debug, Clone)]
pub struct CrawlItem {
    pub id: i64,
    pub url: String,
    pub status: CrawlStatus,
    pub created_at: String,
    pub updated_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

/// Structural facts extracted from a successfully fetched page
///
/// Created exactly once per crawl attempt, immediately before the item
/// transitions to `completed`. A rerun discards and recreates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRecord {
    pub html_version: Option<String>,
    pub page_title: Option<String>,
    pub h1_count: u32,
    pub h2_count: u32,
    pub h3_count: u32,
    pub h4_count: u32,
    pub h5_count: u32,
    pub h6_count: u32,
    pub internal_links_count: u32,
    pub external_links_count: u32,
    pub broken_links_count: u32,
    pub has_login_form: bool,
}

/// One unparsable or dead outbound link discovered during analysis
///
/// Holds the resolved link (or the raw href when it could not be parsed),
/// plus the probe status code or transport error when available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLinkRecord {
    pub link_url: String,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

impl BrokenLinkRecord {
    /// Record for an href that could not be parsed as a URL reference
    pub fn unparsable(raw_href: &str, error: &str) -> Self {
        Self {
            link_url: raw_href.to_string(),
            status_code: None,
            error_message: Some(error.to_string()),
        }
    }

    /// Record for a resolved link whose liveness probe returned >= 400
    pub fn dead(url: &str, status_code: u16) -> Self {
        Self {
            link_url: url.to_string(),
            status_code: Some(status_code),
            error_message: None,
        }
    }

    /// Record for a resolved link whose liveness probe failed transport-side
    pub fn unreachable(url: &str, error: &str) -> Self {
        Self {
            link_url: url.to_string(),
            status_code: None,
            error_message: Some(error.to_string()),
        }
    }
}
