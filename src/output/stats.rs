//! Statistics over the page store
//!
//! Backs the CLI `--stats` mode: a quick look at what previous crawl
//! sessions have accumulated in the database.

use crate::storage::{PageStore, StorageResult};
use chrono::{DateTime, Utc};

/// Summary of the persisted crawl output
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of persisted pages
    pub total_pages: u64,

    /// Number of distinct hosts across all pages
    pub distinct_hosts: u64,

    /// Timestamp of the most recent save, if any pages exist
    pub latest_crawl: Option<DateTime<Utc>>,
}

/// Loads statistics from the page store
pub fn load_statistics(store: &dyn PageStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_pages: store.count_pages()?,
        distinct_hosts: store.count_distinct_hosts()?,
        latest_crawl: store.latest_crawl_time()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Page Store Statistics ===\n");
    println!("  Total pages:    {}", stats.total_pages);
    println!("  Distinct hosts: {}", stats.distinct_hosts);

    match &stats.latest_crawl {
        Some(ts) => println!("  Last crawled:   {}", ts.to_rfc3339()),
        None => println!("  Last crawled:   never"),
    }
}
