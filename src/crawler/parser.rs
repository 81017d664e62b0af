//! HTML parser for title, text, and link extraction
//!
//! Parsing is lenient and infallible: whatever the server sent is parsed as
//! HTML and the pieces we can extract are extracted. Link candidates that do
//! not resolve to usable http(s) URLs are dropped silently.

use crate::url::resolve_link;
use scraper::{Html, Node, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from the <title> tag)
    pub title: Option<String>,

    /// Plain body text with markup, scripts, and styling removed
    pub text: String,

    /// Outgoing links, absolute and fragment-free
    pub links: Vec<Url>,
}

/// Parses an HTML document into title, plain text, and outgoing links
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` targets, resolved against `base_url`.
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - fragment-only anchors
/// - anything that fails to resolve to an http(s) URL
///
/// `rel="nofollow"` links ARE followed.
///
/// # Example
///
/// ```
/// use tidemark::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Tags whose text content is not page content
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracts the visible plain text of the document body
///
/// Walks the body subtree collecting text nodes, skipping script/style/
/// noscript/template subtrees, and collapses all whitespace runs to single
/// spaces.
fn extract_text(document: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut chunks: Vec<&str> = Vec::new();
    let mut stack = vec![*root];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => chunks.push(text),
            Node::Element(element) => {
                if !NON_CONTENT_TAGS.contains(&element.name()) {
                    // Reversed so children pop in document order
                    let mut children: Vec<_> = node.children().collect();
                    children.reverse();
                    stack.extend(children);
                }
            }
            _ => {}
        }
    }

    chunks
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip file downloads
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>Test Page</title></head><body></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test Page  </title></head><body></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_body_text() {
        let html = r#"<html><body><h1>Heading</h1><p>Paragraph text.</p></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.text, "Heading Paragraph text.");
    }

    #[test]
    fn test_text_skips_scripts_and_styles() {
        let html = r#"
            <html><body>
                <p>Visible</p>
                <script>var hidden = "nope";</script>
                <style>.hidden { display: none; }</style>
                <noscript>also hidden</noscript>
                <p>More visible</p>
            </body></html>
        "#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.text, "Visible More visible");
    }

    #[test]
    fn test_text_collapses_whitespace() {
        let html = "<html><body><p>a\n\n   b\t c</p></body></html>";
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.text, "a b c");
    }

    #[test]
    fn test_text_of_nested_markup() {
        let html = r#"<html><body><div>outer <span>inner</span> tail</div></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.text, "outer inner tail");
    }

    #[test]
    fn test_extract_absolute_link() {
        let html = r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].as_str(), "https://other.com/page");
    }

    #[test]
    fn test_extract_relative_link() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].as_str(), "https://example.com/other");
    }

    #[test]
    fn test_link_fragment_stripped() {
        let html = r##"<html><body><a href="/other#part">Link</a></body></html>"##;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links[0].as_str(), "https://example.com/other");
    }

    #[test]
    fn test_skip_javascript_and_mailto_links() {
        let html = r#"
            <html><body>
                <a href="javascript:void(0)">js</a>
                <a href="mailto:test@example.com">mail</a>
                <a href="tel:+1234567890">tel</a>
            </body></html>
        "#;
        let parsed = parse_page(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_skip_download_link() {
        let html = r#"<html><body><a href="/file.pdf" download>Download</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_skip_fragment_only() {
        let html = r##"<html><body><a href="#section">Jump</a></body></html>"##;
        let parsed = parse_page(html, &base_url());
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_follow_nofollow_links() {
        let html = r#"<html><body><a href="/page2" rel="nofollow">Link</a></body></html>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links.len(), 1);
    }

    #[test]
    fn test_mixed_valid_and_invalid_links() {
        let html = r#"
            <html><body>
                <a href="/valid">Valid</a>
                <a href="javascript:alert('no')">Invalid</a>
                <a href="/another-valid">Valid</a>
            </body></html>
        "#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links.len(), 2);
    }

    #[test]
    fn test_malformed_html_still_parses() {
        let html = "<html><body><p>unclosed <a href='/x'>link";
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links.len(), 1);
        assert!(parsed.text.contains("unclosed"));
    }
}
