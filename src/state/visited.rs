use std::collections::HashSet;
use std::sync::Mutex;

/// Concurrent set of URLs claimed during the current session
///
/// The set records *final* URLs — post-redirect, fragment-stripped — and the
/// claim is an atomic test-and-insert: of any number of concurrent callers
/// presenting the same URL, exactly one gets `true` and proceeds to persist
/// and expand the page.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<String>>,
}

impl VisitedSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a URL for the calling worker
    ///
    /// Returns `true` only for the caller that performed the insertion;
    /// every other caller — earlier or concurrent — gets `false` and must
    /// not fetch, persist, or expand the URL.
    pub fn try_claim(&self, url: &str) -> bool {
        self.inner.lock().unwrap().insert(url.to_string())
    }

    /// Returns whether a URL has already been claimed
    pub fn contains(&self, url: &str) -> bool {
        self.inner.lock().unwrap().contains(url)
    }

    /// Number of unique URLs claimed so far
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Returns whether no URL has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_claim_wins() {
        let visited = VisitedSet::new();
        assert!(visited.try_claim("https://example.com/"));
        assert!(!visited.try_claim("https://example.com/"));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_distinct_urls_claim_independently() {
        let visited = VisitedSet::new();
        assert!(visited.try_claim("https://example.com/a"));
        assert!(visited.try_claim("https://example.com/b"));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn test_contains() {
        let visited = VisitedSet::new();
        assert!(!visited.contains("https://example.com/"));
        visited.try_claim("https://example.com/");
        assert!(visited.contains("https://example.com/"));
    }

    #[test]
    fn test_empty() {
        let visited = VisitedSet::new();
        assert!(visited.is_empty());
        visited.try_claim("https://example.com/");
        assert!(!visited.is_empty());
    }

    #[test]
    fn test_concurrent_claims_exactly_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let visited = Arc::clone(&visited);
            handles.push(std::thread::spawn(move || {
                visited.try_claim("https://example.com/contended") as usize
            }));
        }

        let winners: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(winners, 1);
        assert_eq!(visited.len(), 1);
    }
}
