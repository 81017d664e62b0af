//! Persistence layer for crawled pages
//!
//! The crawler talks to storage through the [`PageStore`] trait: an
//! idempotent lookup-by-URL and a save that assigns the crawl timestamp.
//! [`SqliteStorage`] is the SQLite-backed implementation.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PageStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};

/// A crawled page as persisted by the sink
///
/// Created on the first successful fetch of a URL not already stored and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    /// Database row ID
    pub id: i64,

    /// Final URL of the page (post-redirect, fragment-free)
    pub url: String,

    /// Page title, if the document had one
    pub title: Option<String>,

    /// Extracted plain-text content
    pub content: String,

    /// When the page was saved, assigned by the sink
    pub crawled_at: DateTime<Utc>,
}
