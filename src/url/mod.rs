//! URL handling for tidemark
//!
//! This module provides the crawl scope predicate and the URL helpers used by
//! the fetch pipeline: host extraction, fragment stripping, and link
//! resolution. Malformed input is never an error here — helpers return
//! `Option` and the caller drops the candidate, so one bad link cannot abort
//! the task that discovered it.

use url::Url;

/// Decides whether a candidate host belongs to the crawl's target domain
///
/// A candidate is in scope when it equals the seed host or is a subdomain of
/// it on a dot boundary. The comparison is ASCII-case-insensitive.
///
/// The dot boundary matters: a bare suffix check would let `evilexample.com`
/// pass for a seed of `example.com`.
///
/// # Examples
///
/// ```
/// use tidemark::url::in_scope;
///
/// assert!(in_scope("example.com", "example.com"));
/// assert!(in_scope("example.com", "docs.example.com"));
/// assert!(!in_scope("example.com", "evilexample.com"));
/// assert!(!in_scope("example.com", "example.org"));
/// ```
pub fn in_scope(seed_host: &str, candidate_host: &str) -> bool {
    let seed = seed_host.to_ascii_lowercase();
    let candidate = candidate_host.to_ascii_lowercase();

    if candidate == seed {
        return true;
    }

    candidate
        .strip_suffix(&seed)
        .map(|prefix| prefix.ends_with('.'))
        .unwrap_or(false)
}

/// Extracts the lowercase host of a URL string
///
/// Returns `None` for unparseable URLs or URLs without a host component;
/// such candidates are treated as out of scope by the caller.
pub fn host_of(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str).ok()?;
    url.host_str().map(|h| h.to_lowercase())
}

/// Removes the fragment identifier from a URL, in place
///
/// The deduplicator operates on fragment-free URLs: `/page` and
/// `/page#section` are the same document.
pub fn strip_fragment(url: &mut Url) {
    url.set_fragment(None);
}

/// Resolves a link href against a base URL and validates it
///
/// Returns `None` if the link should be excluded:
/// - empty hrefs and fragment-only links (same-page anchors)
/// - `javascript:`, `mailto:`, `tel:`, `data:` schemes
/// - unparseable hrefs
/// - non-HTTP(S) URLs after resolution
///
/// The returned URL has its fragment stripped.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(mut absolute_url) => {
            if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
                return None;
            }
            strip_fragment(&mut absolute_url);
            Some(absolute_url)
        }
        Err(_) => None,
    }
}
