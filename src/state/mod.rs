//! Session-scoped crawl state
//!
//! Everything here is owned by a single [`crate::crawler::CrawlSession`] and
//! dies with it; nothing is shared across sessions.

mod phase;
mod visited;

pub use phase::SessionPhase;
pub use visited::VisitedSet;
