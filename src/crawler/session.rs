//! Crawl session: task scheduler, worker pool, and quiescence monitor
//!
//! A session owns every piece of coordination state for one crawl — the
//! visited set, the rate limiter, the HTTP client, the pool — so overlapping
//! sessions cannot interfere with each other. The workload is
//! self-replicating: tasks submit new tasks, and the session detects
//! completion with an outstanding-work counter rather than by watching for an
//! empty queue, which would race against a worker that is still expanding
//! links.

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::limiter::RateLimiter;
use crate::crawler::pipeline::{run_task, CrawlTask, TaskOutcome};
use crate::state::{SessionPhase, VisitedSet};
use crate::storage::PageStore;
use crate::CrawlError;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use url::Url;

/// Per-outcome tallies for one session
#[derive(Debug, Default)]
pub(crate) struct SessionStats {
    pub submitted: AtomicU64,
    pub rejected_depth: AtomicU64,
    pub rejected_frontier: AtomicU64,
    pub crawled: AtomicU64,
    pub already_claimed: AtomicU64,
    pub already_persisted: AtomicU64,
    pub not_html: AtomicU64,
    pub failed: AtomicU64,
}

impl SessionStats {
    fn record(&self, outcome: TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Crawled => &self.crawled,
            TaskOutcome::AlreadyClaimed => &self.already_claimed,
            TaskOutcome::AlreadyPersisted => &self.already_persisted,
            TaskOutcome::NotHtml => &self.not_html,
            TaskOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Shared internals of a running session
///
/// Held behind an `Arc` by the session and by every spawned task.
pub(crate) struct SessionInner {
    /// Host of the seed URL; the scope filter compares against this
    pub(crate) root_host: String,

    /// Maximum link depth; deeper submissions are rejected
    pub(crate) max_depth: u32,

    /// Outstanding-task bound; submissions beyond it are rejected
    pub(crate) max_frontier: usize,

    /// HTTP client shared by all workers
    pub(crate) client: Client,

    /// Token bucket shared by all workers
    pub(crate) limiter: RateLimiter,

    /// Final URLs claimed this session
    pub(crate) visited: VisitedSet,

    /// Page sink; serialized behind a mutex
    pub(crate) store: Mutex<Box<dyn PageStore>>,

    /// Worker-slot permits; pool size permits total
    workers: Semaphore,

    /// Tasks submitted but not yet finished (queued + active)
    outstanding: AtomicUsize,

    /// Signalled when `outstanding` reaches zero
    idle: Notify,

    pub(crate) stats: SessionStats,

    phase: Mutex<SessionPhase>,

    /// Handles of every spawned task, for graceful drain and force-cancel
    tasks: Mutex<JoinSet<()>>,
}

impl SessionInner {
    /// Submits a task to the pool
    ///
    /// Returns `false` when the task was rejected — past the depth limit or
    /// over the frontier bound. Rejection (not blocking) is the backpressure
    /// policy: a blocking submit from inside a worker could deadlock the
    /// fixed pool.
    pub(crate) fn submit(self: &Arc<Self>, task: CrawlTask) -> bool {
        if task.depth > self.max_depth {
            self.stats.rejected_depth.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(url = %task.url, depth = task.depth, "rejecting task beyond max depth");
            return false;
        }

        if self.outstanding.load(Ordering::SeqCst) >= self.max_frontier {
            self.stats.rejected_frontier.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(url = %task.url, "frontier bound reached, dropping task");
            return false;
        }

        // Incremented before spawning; a child's increment therefore always
        // precedes its parent's decrement, and the counter cannot touch zero
        // while any task can still expand.
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);

        let inner = Arc::clone(self);
        self.tasks.lock().unwrap().spawn(async move {
            let _permit = match inner.workers.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    inner.finish_task();
                    return;
                }
            };

            let outcome = run_task(&inner, task).await;
            inner.stats.record(outcome);
            inner.finish_task();
        });

        true
    }

    fn finish_task(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_one();
        }
    }

    fn advance_phase(&self, next: SessionPhase) {
        let mut phase = self.phase.lock().unwrap();
        debug_assert!(
            phase.can_advance_to(next),
            "illegal phase change {} -> {}",
            *phase,
            next
        );
        tracing::debug!(from = %*phase, to = %next, "session phase change");
        *phase = next;
    }
}

/// Final accounting of a crawl session, returned at quiescence
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Unique final URLs claimed (size of the visited set)
    pub unique_urls: usize,

    /// Pages fetched, parsed, and saved this session
    pub pages_persisted: u64,

    /// Tasks that lost the claim race or re-presented a claimed URL
    pub already_claimed: u64,

    /// Tasks skipped because a record existed from an earlier crawl
    pub already_persisted: u64,

    /// Tasks that hit a non-HTML document
    pub not_html: u64,

    /// Tasks abandoned on fetch/store errors
    pub failed: u64,

    /// Tasks accepted by the scheduler
    pub submitted: u64,

    /// Submissions rejected for exceeding the depth limit
    pub rejected_depth: u64,

    /// Submissions dropped by frontier backpressure
    pub rejected_frontier: u64,

    /// Wall-clock session duration
    pub elapsed: Duration,
}

/// One crawl invocation: seed URL, depth bound, and private coordination state
///
/// # Example
///
/// ```no_run
/// use tidemark::config::load_config;
/// use tidemark::crawler::CrawlSession;
/// use tidemark::storage::SqliteStorage;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let store = SqliteStorage::new(Path::new(&config.output.database_path))?;
/// let session = CrawlSession::new(&config, "https://example.com/", 2, Box::new(store))?;
/// let report = session.run().await;
/// println!("claimed {} unique URLs", report.unique_urls);
/// # Ok(())
/// # }
/// ```
pub struct CrawlSession {
    inner: Arc<SessionInner>,
    seed: Url,
    workers: u32,
    grace: Duration,
}

impl CrawlSession {
    /// Creates a session for one crawl invocation
    ///
    /// The seed URL must parse and carry a host; its host becomes the crawl
    /// scope. All coordination state is constructed here, so concurrent
    /// sessions are fully isolated from each other.
    pub fn new(
        config: &Config,
        seed: &str,
        max_depth: u32,
        store: Box<dyn PageStore>,
    ) -> Result<Self, CrawlError> {
        let mut seed_url = Url::parse(seed).map_err(|e| CrawlError::InvalidSeed {
            url: seed.to_string(),
            message: e.to_string(),
        })?;
        crate::url::strip_fragment(&mut seed_url);

        let root_host = seed_url
            .host_str()
            .map(str::to_lowercase)
            .ok_or_else(|| CrawlError::InvalidSeed {
                url: seed.to_string(),
                message: "URL has no host".to_string(),
            })?;

        let client = build_http_client(
            &config.user_agent,
            Duration::from_millis(config.crawler.fetch_timeout_ms),
        )?;

        let inner = Arc::new(SessionInner {
            root_host,
            max_depth,
            max_frontier: config.crawler.max_frontier as usize,
            client,
            limiter: RateLimiter::new(
                config.crawler.requests_per_second,
                config.crawler.rate_burst,
            ),
            visited: VisitedSet::new(),
            store: Mutex::new(store),
            workers: Semaphore::new(config.crawler.workers as usize),
            outstanding: AtomicUsize::new(0),
            idle: Notify::new(),
            stats: SessionStats::default(),
            phase: Mutex::new(SessionPhase::Running),
            tasks: Mutex::new(JoinSet::new()),
        });

        Ok(Self {
            inner,
            seed: seed_url,
            workers: config.crawler.workers,
            grace: Duration::from_millis(config.crawler.shutdown_grace_ms),
        })
    }

    /// Runs the session to quiescence and returns its report
    ///
    /// Individual task failures never fail the session; whatever the crawl
    /// accomplished is reported.
    pub async fn run(self) -> SessionReport {
        let start = Instant::now();
        tracing::info!(
            seed = %self.seed,
            max_depth = self.inner.max_depth,
            workers = self.workers,
            "starting crawl session"
        );

        self.inner.submit(CrawlTask {
            url: self.seed.clone(),
            depth: 0,
        });

        // Quiescence: queued and active are zero together exactly when the
        // outstanding counter is zero.
        while self.inner.outstanding.load(Ordering::SeqCst) > 0 {
            self.inner.idle.notified().await;
        }

        self.inner.advance_phase(SessionPhase::Draining);

        // All task bodies have finished; give their handles a bounded grace
        // period to wind down, then cancel whatever is left.
        let mut tasks = std::mem::take(&mut *self.inner.tasks.lock().unwrap());
        let drained = tokio::time::timeout(self.grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                "grace period expired, force-cancelling workers"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        self.inner.advance_phase(SessionPhase::Done);

        let stats = &self.inner.stats;
        let report = SessionReport {
            unique_urls: self.inner.visited.len(),
            pages_persisted: stats.crawled.load(Ordering::Relaxed),
            already_claimed: stats.already_claimed.load(Ordering::Relaxed),
            already_persisted: stats.already_persisted.load(Ordering::Relaxed),
            not_html: stats.not_html.load(Ordering::Relaxed),
            failed: stats.failed.load(Ordering::Relaxed),
            submitted: stats.submitted.load(Ordering::Relaxed),
            rejected_depth: stats.rejected_depth.load(Ordering::Relaxed),
            rejected_frontier: stats.rejected_frontier.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            unique_urls = report.unique_urls,
            pages_persisted = report.pages_persisted,
            failed = report.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "crawl session finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, OutputConfig, UserAgentConfig};
    use crate::storage::{PageRecord, StorageResult};
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;

    fn test_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                max_depth: 2,
                workers: 4,
                requests_per_second: 1000.0,
                rate_burst: 100,
                fetch_timeout_ms: 2000,
                max_frontier: 100,
                shutdown_grace_ms: 1000,
            },
            user_agent: UserAgentConfig {
                crawler_name: "tidemark-test".to_string(),
                crawler_version: "0.0".to_string(),
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
            },
        }
    }

    /// Trivial in-memory sink for scheduler tests
    #[derive(Default)]
    struct MemoryStore {
        pages: HashMap<String, PageRecord>,
        next_id: i64,
    }

    impl crate::storage::PageStore for MemoryStore {
        fn lookup(&self, url: &str) -> StorageResult<Option<PageRecord>> {
            Ok(self.pages.get(url).cloned())
        }

        fn save(
            &mut self,
            url: &str,
            title: Option<&str>,
            content: &str,
        ) -> StorageResult<PageRecord> {
            if let Some(existing) = self.pages.get(url) {
                return Ok(existing.clone());
            }
            self.next_id += 1;
            let record = PageRecord {
                id: self.next_id,
                url: url.to_string(),
                title: title.map(str::to_string),
                content: content.to_string(),
                crawled_at: Utc::now(),
            };
            self.pages.insert(url.to_string(), record.clone());
            Ok(record)
        }

        fn count_pages(&self) -> StorageResult<u64> {
            Ok(self.pages.len() as u64)
        }

        fn count_distinct_hosts(&self) -> StorageResult<u64> {
            let hosts: std::collections::HashSet<_> = self
                .pages
                .keys()
                .filter_map(|url| crate::url::host_of(url))
                .collect();
            Ok(hosts.len() as u64)
        }

        fn latest_crawl_time(&self) -> StorageResult<Option<DateTime<Utc>>> {
            Ok(self.pages.values().map(|p| p.crawled_at).max())
        }
    }

    fn test_session(max_depth: u32) -> CrawlSession {
        CrawlSession::new(
            &test_config(),
            "https://example.com/",
            max_depth,
            Box::new(MemoryStore::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_seed_rejected() {
        let result = CrawlSession::new(
            &test_config(),
            "not a url",
            2,
            Box::new(MemoryStore::default()),
        );
        assert!(matches!(result, Err(CrawlError::InvalidSeed { .. })));
    }

    #[test]
    fn test_hostless_seed_rejected() {
        let result = CrawlSession::new(
            &test_config(),
            "data:text/plain,hello",
            2,
            Box::new(MemoryStore::default()),
        );
        assert!(matches!(result, Err(CrawlError::InvalidSeed { .. })));
    }

    #[test]
    fn test_seed_fragment_stripped() {
        let session = CrawlSession::new(
            &test_config(),
            "https://example.com/start#middle",
            2,
            Box::new(MemoryStore::default()),
        )
        .unwrap();
        assert_eq!(session.seed.as_str(), "https://example.com/start");
    }

    #[tokio::test]
    async fn test_submit_rejects_beyond_max_depth() {
        let session = test_session(1);

        let accepted = session.inner.submit(CrawlTask {
            url: Url::parse("https://example.com/deep").unwrap(),
            depth: 2,
        });

        assert!(!accepted);
        assert_eq!(session.inner.stats.rejected_depth.load(Ordering::Relaxed), 1);
        assert_eq!(session.inner.outstanding.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_when_frontier_full() {
        let session = test_session(2);
        session
            .inner
            .outstanding
            .store(session.inner.max_frontier, Ordering::SeqCst);

        let accepted = session.inner.submit(CrawlTask {
            url: Url::parse("https://example.com/more").unwrap(),
            depth: 0,
        });

        assert!(!accepted);
        assert_eq!(
            session.inner.stats.rejected_frontier.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_session_quiesces_when_seed_fetch_fails() {
        // Port 1 refuses connections immediately
        let session = CrawlSession::new(
            &test_config(),
            "http://127.0.0.1:1/",
            2,
            Box::new(MemoryStore::default()),
        )
        .unwrap();

        let report = session.run().await;

        assert_eq!(report.submitted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.pages_persisted, 0);
        assert_eq!(report.unique_urls, 0);
    }
}
