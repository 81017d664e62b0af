//! Crawler module: the scheduler and its per-task pipeline
//!
//! This module contains the core crawling logic:
//! - Token-bucket rate limiting shared across workers
//! - HTTP fetching with redirect resolution
//! - HTML parsing and link extraction
//! - The self-replicating task pool with quiescence detection

mod fetcher;
mod limiter;
mod parser;
mod pipeline;
mod session;

pub use fetcher::{build_http_client, fetch_url, FetchError, FetchedPage};
pub use limiter::RateLimiter;
pub use parser::{parse_page, ParsedPage};
pub use pipeline::{CrawlTask, TaskOutcome};
pub use session::{CrawlSession, SessionReport};

use crate::config::Config;
use crate::storage::SqliteStorage;
use std::path::Path;

/// Runs one complete crawl session against the configured database
///
/// This is the main entry point for starting a crawl: it opens the page
/// store, builds a fresh session around the seed URL, and drives it to
/// quiescence. When `max_depth` is `None` the configured default applies.
///
/// Awaiting the returned future is the completion notification; the report
/// carries the final per-outcome tallies.
pub async fn crawl(
    config: &Config,
    seed: &str,
    max_depth: Option<u32>,
) -> crate::Result<SessionReport> {
    let store = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let max_depth = max_depth.unwrap_or(config.crawler.max_depth);
    let session = CrawlSession::new(config, seed, max_depth, Box::new(store))?;
    Ok(session.run().await)
}
