//! SQLite storage implementation
//!
//! This module provides the SQLite-backed implementation of the [`PageStore`]
//! trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::PageRecord;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite page store
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if necessary) the database at the given path
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
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(i64, String, Option<String>, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn record_from_parts(
        parts: (i64, String, Option<String>, String, String),
    ) -> StorageResult<PageRecord> {
        let (id, url, title, content, crawled_at) = parts;
        let crawled_at = DateTime::parse_from_rfc3339(&crawled_at)
            .map_err(|e| StorageError::Serialization(format!("bad crawled_at timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(PageRecord {
            id,
            url,
            title,
            content,
            crawled_at,
        })
    }

    fn get_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, url, title, content, crawled_at FROM pages WHERE url = ?1",
                params![url],
                Self::row_to_record,
            )
            .optional()?;

        parts.map(Self::record_from_parts).transpose()
    }
}

impl PageStore for SqliteStorage {
    fn lookup(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        self.get_by_url(url)
    }

    fn save(
        &mut self,
        url: &str,
        title: Option<&str>,
        content: &str,
    ) -> StorageResult<PageRecord> {
        let host = crate::url::host_of(url).unwrap_or_default();
        let crawled_at = Utc::now().to_rfc3339();

        // The UNIQUE constraint on url makes a duplicate save a no-op; the
        // first writer's row is read back and returned.
        self.conn.execute(
            "INSERT INTO pages (url, host, title, content, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(url) DO NOTHING",
            params![url, host, title, content, crawled_at],
        )?;

        self.get_by_url(url)?.ok_or_else(|| {
            StorageError::Serialization(format!("page vanished after save: {}", url))
        })
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_distinct_hosts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT host) FROM pages", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }

    fn latest_crawl_time(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let latest: Option<String> = self
            .conn
            .query_row("SELECT MAX(crawled_at) FROM pages", [], |row| row.get(0))?;

        latest
            .map(|ts| {
                DateTime::parse_from_rfc3339(&ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        StorageError::Serialization(format!("bad crawled_at timestamp: {}", e))
                    })
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_lookup() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let saved = storage
            .save("https://example.com/", Some("Home"), "welcome text")
            .unwrap();
        assert_eq!(saved.url, "https://example.com/");
        assert_eq!(saved.title.as_deref(), Some("Home"));
        assert_eq!(saved.content, "welcome text");

        let found = storage.lookup("https://example.com/").unwrap().unwrap();
        assert_eq!(found, saved);
    }

    #[test]
    fn test_lookup_missing_returns_none() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.lookup("https://example.com/nope").unwrap().is_none());
    }

    #[test]
    fn test_save_without_title() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let saved = storage.save("https://example.com/", None, "text").unwrap();
        assert!(saved.title.is_none());
    }

    #[test]
    fn test_duplicate_save_keeps_original_row() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let first = storage
            .save("https://example.com/", Some("First"), "first content")
            .unwrap();
        let second = storage
            .save("https://example.com/", Some("Second"), "second content")
            .unwrap();

        // Original wins; no second row
        assert_eq!(second.id, first.id);
        assert_eq!(second.title.as_deref(), Some("First"));
        assert_eq!(second.content, "first content");
        assert_eq!(storage.count_pages().unwrap(), 1);
    }

    #[test]
    fn test_count_pages() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.count_pages().unwrap(), 0);

        storage.save("https://example.com/a", None, "a").unwrap();
        storage.save("https://example.com/b", None, "b").unwrap();
        assert_eq!(storage.count_pages().unwrap(), 2);
    }

    #[test]
    fn test_count_distinct_hosts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.save("https://example.com/a", None, "a").unwrap();
        storage.save("https://example.com/b", None, "b").unwrap();
        storage.save("https://docs.example.com/", None, "c").unwrap();

        assert_eq!(storage.count_distinct_hosts().unwrap(), 2);
    }

    #[test]
    fn test_latest_crawl_time() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.latest_crawl_time().unwrap().is_none());

        let before = Utc::now();
        storage.save("https://example.com/", None, "x").unwrap();
        let latest = storage.latest_crawl_time().unwrap().unwrap();

        assert!(latest >= before - chrono::Duration::seconds(1));
        assert!(latest <= Utc::now() + chrono::Duration::seconds(1));
    }

    #[test]
    fn test_crawled_at_assigned_by_save() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let before = Utc::now();
        let saved = storage.save("https://example.com/", None, "x").unwrap();

        assert!(saved.crawled_at >= before - chrono::Duration::seconds(1));
    }
}
