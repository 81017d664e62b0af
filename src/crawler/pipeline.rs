//! Fetch–parse–expand pipeline, executed once per dispatched task
//!
//! The pipeline is fire-and-forget per URL: every failure is caught here,
//! mapped to an explicit [`TaskOutcome`], and never propagated to the pool or
//! to sibling tasks. Side effects completed before a failure stand.

use crate::crawler::fetcher::{fetch_url, FetchError};
use crate::crawler::parser::parse_page;
use crate::crawler::session::SessionInner;
use crate::url::in_scope;
use std::sync::Arc;
use url::Url;

/// A unit of crawl work: one URL at one depth
///
/// Immutable once created; produced by the session seed or by expansion of a
/// completed task, and consumed exactly once by a worker.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    /// The URL to fetch (fragment-free)
    pub url: Url,

    /// Link distance from the seed URL
    pub depth: u32,
}

/// Explicit result of one dispatched task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Fetched, persisted, and expanded
    Crawled,

    /// Another worker owns the final URL
    AlreadyClaimed,

    /// A record for the final URL existed before this session
    AlreadyPersisted,

    /// The response was not an HTML document
    NotHtml,

    /// Fetch, lookup, or save failed; the task was abandoned
    Failed,
}

/// Runs the full pipeline for one task
///
/// Step order is load-bearing: the claim happens on the *final* URL, after
/// redirect resolution, so distinct pre-redirect URLs converging on one
/// document collapse to a single record.
pub(crate) async fn run_task(session: &Arc<SessionInner>, task: CrawlTask) -> TaskOutcome {
    session.limiter.acquire().await;

    // Cheap duplicate peek before spending a fetch. The authoritative
    // test-and-insert happens on the final URL below.
    if session.visited.contains(task.url.as_str()) {
        tracing::trace!(url = %task.url, "submitted URL already claimed");
        return TaskOutcome::AlreadyClaimed;
    }

    let page = match fetch_url(&session.client, &task.url).await {
        Ok(page) => page,
        Err(FetchError::NotHtml { url, content_type }) => {
            tracing::debug!(url = %url, content_type = %content_type, "skipping non-HTML document");
            return TaskOutcome::NotHtml;
        }
        Err(e) => {
            tracing::debug!(url = %task.url, error = %e, "fetch failed");
            return TaskOutcome::Failed;
        }
    };

    if !session.visited.try_claim(page.final_url.as_str()) {
        tracing::trace!(url = %page.final_url, "lost claim race");
        return TaskOutcome::AlreadyClaimed;
    }

    // Incremental-crawl skip: a record from an earlier session stands
    let existing = { session.store.lock().unwrap().lookup(page.final_url.as_str()) };
    match existing {
        Ok(Some(_)) => {
            tracing::debug!(url = %page.final_url, "already persisted, skipping");
            return TaskOutcome::AlreadyPersisted;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(url = %page.final_url, error = %e, "store lookup failed");
            return TaskOutcome::Failed;
        }
    }

    let parsed = parse_page(&page.body, &page.final_url);

    {
        let mut store = session.store.lock().unwrap();
        if let Err(e) = store.save(page.final_url.as_str(), parsed.title.as_deref(), &parsed.text)
        {
            tracing::warn!(url = %page.final_url, error = %e, "failed to persist page");
            return TaskOutcome::Failed;
        }
    }

    tracing::info!(
        url = %page.final_url,
        depth = task.depth,
        title = parsed.title.as_deref().unwrap_or(""),
        "crawled page"
    );

    let mut enqueued = 0usize;
    for link in parsed.links {
        let Some(host) = link.host_str() else { continue };
        if !in_scope(&session.root_host, host) {
            continue;
        }
        if session.submit(CrawlTask {
            url: link,
            depth: task.depth + 1,
        }) {
            enqueued += 1;
        }
    }
    tracing::debug!(url = %page.final_url, enqueued, "expanded page links");

    TaskOutcome::Crawled
}
