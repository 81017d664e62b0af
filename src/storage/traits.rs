//! Storage trait and error types

use crate::storage::PageRecord;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page persistence backends
///
/// Implementations must tolerate calls from multiple workers; the session
/// serializes access behind a mutex, so `&mut self` here is fine.
pub trait PageStore: Send {
    /// Looks up a page by its final URL
    ///
    /// Idempotent; returns `None` when the URL has never been persisted.
    fn lookup(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Persists a page, assigning the crawl timestamp
    ///
    /// Saving a URL that already exists is not an error: the original row
    /// wins and is returned unchanged, so concurrent saves of one URL
    /// converge on a single record.
    fn save(&mut self, url: &str, title: Option<&str>, content: &str)
        -> StorageResult<PageRecord>;

    /// Total number of persisted pages
    fn count_pages(&self) -> StorageResult<u64>;

    /// Number of distinct hosts across persisted pages
    fn count_distinct_hosts(&self) -> StorageResult<u64>;

    /// Timestamp of the most recently saved page, if any
    fn latest_crawl_time(&self) -> StorageResult<Option<DateTime<Utc>>>;
}
