//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::CrawlStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{AnalysisRecord, BrokenLinkRecord, CrawlItem};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use std::path::Path;

const ITEM_COLUMNS: &str =
    "id, url, status, created_at, updated_at, started_at, completed_at, error_message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates a database at the given path
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn map_item(row: &Row<'_>) -> rusqlite::Result<CrawlItem> {
        Ok(CrawlItem {
            id: row.get(0)?,
            url: row.get(1)?,
            status: CrawlStatus::from_db_string(&row.get::<_, String>(2)?)
                .unwrap_or(CrawlStatus::Failed),
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            started_at: row.get(5)?,
            completed_at: row.get(6)?,
            error_message: row.get(7)?,
        })
    }

    fn map_analysis(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
        Ok(AnalysisRecord {
            html_version: row.get(0)?,
            page_title: row.get(1)?,
            h1_count: row.get(2)?,
            h2_count: row.get(3)?,
            h3_count: row.get(4)?,
            h4_count: row.get(5)?,
            h5_count: row.get(6)?,
            h6_count: row.get(7)?,
            internal_links_count: row.get(8)?,
            external_links_count: row.get(9)?,
            broken_links_count: row.get(10)?,
            has_login_form: row.get(11)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Item Management =====

    fn create_item(&mut self, url: &str) -> StorageResult<CrawlItem> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO urls (url, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![url, CrawlStatus::Queued.to_db_string(), now],
        )?;
        self.get_item(self.conn.last_insert_rowid())
    }

    fn get_item(&self, id: i64) -> StorageResult<CrawlItem> {
        let query = format!("SELECT {} FROM urls WHERE id = ?1", ITEM_COLUMNS);
        self.conn
            .query_row(&query, params![id], Self::map_item)
            .optional()?
            .ok_or(StorageError::ItemNotFound(id))
    }

    fn list_items(&self) -> StorageResult<Vec<CrawlItem>> {
        let query = format!(
            "SELECT {} FROM urls ORDER BY created_at DESC, id DESC",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&query)?;
        let items = stmt
            .query_map([], Self::map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn list_queued(&self) -> StorageResult<Vec<CrawlItem>> {
        let query = format!(
            "SELECT {} FROM urls WHERE status = 'queued' ORDER BY created_at ASC, id ASC",
            ITEM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&query)?;
        let items = stmt
            .query_map([], Self::map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn delete_item(&mut self, id: i64) -> StorageResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM urls WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StorageError::ItemNotFound(id));
        }
        Ok(())
    }

    // ===== Lifecycle Transitions =====

    fn set_status(
        &mut self,
        id: i64,
        status: CrawlStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let current = self.get_item(id)?.status;
        if !current.can_transition(status) {
            return Err(StorageError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        let now = Utc::now().to_rfc3339();
        match status {
            CrawlStatus::Running => {
                self.conn.execute(
                    "UPDATE urls SET status = ?1, updated_at = ?2, started_at = ?2 WHERE id = ?3",
                    params![status.to_db_string(), now, id],
                )?;
            }
            CrawlStatus::Completed => {
                self.conn.execute(
                    "UPDATE urls SET status = ?1, updated_at = ?2, completed_at = ?2 WHERE id = ?3",
                    params![status.to_db_string(), now, id],
                )?;
            }
            CrawlStatus::Failed => {
                self.conn.execute(
                    "UPDATE urls SET status = ?1, updated_at = ?2, completed_at = ?2,
                     error_message = ?3 WHERE id = ?4",
                    params![status.to_db_string(), now, error_message, id],
                )?;
            }
            // can_transition never admits Queued as a target
            CrawlStatus::Queued => unreachable!("queued is only reachable via reset_for_rerun"),
        }

        Ok(())
    }

    fn reset_for_rerun(&mut self, id: i64) -> StorageResult<()> {
        // Existence check before mutating anything
        self.get_item(id)?;

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE urls SET status = ?1, updated_at = ?2, started_at = NULL,
             completed_at = NULL, error_message = NULL WHERE id = ?3",
            params![CrawlStatus::Queued.to_db_string(), now, id],
        )?;
        tx.execute("DELETE FROM analysis_results WHERE url_id = ?1", params![id])?;
        tx.execute("DELETE FROM broken_links WHERE url_id = ?1", params![id])?;
        tx.commit()?;

        Ok(())
    }

    // ===== Analysis Results =====

    fn save_analysis(
        &mut self,
        id: i64,
        analysis: &AnalysisRecord,
        broken_links: &[BrokenLinkRecord],
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        // A rerun may leave stale artifacts; replace rather than append
        tx.execute("DELETE FROM analysis_results WHERE url_id = ?1", params![id])?;
        tx.execute("DELETE FROM broken_links WHERE url_id = ?1", params![id])?;

        tx.execute(
            "INSERT INTO analysis_results (url_id, html_version, page_title,
             h1_count, h2_count, h3_count, h4_count, h5_count, h6_count,
             internal_links_count, external_links_count, broken_links_count,
             has_login_form, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                analysis.html_version,
                analysis.page_title,
                analysis.h1_count,
                analysis.h2_count,
                analysis.h3_count,
                analysis.h4_count,
                analysis.h5_count,
                analysis.h6_count,
                analysis.internal_links_count,
                analysis.external_links_count,
                analysis.broken_links_count,
                analysis.has_login_form,
                now,
            ],
        )?;

        for link in broken_links {
            tx.execute(
                "INSERT INTO broken_links (url_id, link_url, status_code, error_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, link.link_url, link.status_code, link.error_message, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_analysis(&self, id: i64) -> StorageResult<Option<AnalysisRecord>> {
        let analysis = self
            .conn
            .query_row(
                "SELECT html_version, page_title, h1_count, h2_count, h3_count,
                 h4_count, h5_count, h6_count, internal_links_count,
                 external_links_count, broken_links_count, has_login_form
                 FROM analysis_results WHERE url_id = ?1",
                params![id],
                Self::map_analysis,
            )
            .optional()?;
        Ok(analysis)
    }

    fn get_broken_links(&self, id: i64) -> StorageResult<Vec<BrokenLinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT link_url, status_code, error_message FROM broken_links
             WHERE url_id = ?1 ORDER BY id ASC",
        )?;
        let links = stmt
            .query_map(params![id], |row| {
                Ok(BrokenLinkRecord {
                    link_url: row.get(0)?,
                    status_code: row.get(1)?,
                    error_message: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: CrawlStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
