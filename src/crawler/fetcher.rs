//! HTTP fetcher implementation
//!
//! One fetch per task: bounded timeout, redirects followed by the client (up
//! to 10 hops), and the final URL reported with its fragment stripped, since
//! that is what the deduplicator claims.

use crate::config::UserAgentConfig;
use crate::url::strip_fragment;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single fetch attempt
///
/// All of these are per-task: the task that hit them is abandoned and the
/// session carries on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Not an HTML document at {url}: {content_type}")]
    NotHtml { url: String, content_type: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

/// A successfully fetched HTML page
#[derive(Debug)]
pub struct FetchedPage {
    /// URL after redirects, fragment stripped
    pub final_url: Url,

    /// HTTP status code (2xx)
    pub status: u16,

    /// Raw HTML body
    pub body: String,
}

/// Builds the HTTP client shared by all workers of a session
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns the HTML body with its final URL
///
/// Redirects are followed by the client; the URL reported back is the one
/// that actually answered, with any fragment removed. Non-2xx statuses and
/// non-HTML content types are errors — the original URL of the task is not
/// good enough to claim, so callers must use `final_url`.
pub async fn fetch_url(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| classify_send_error(url, e))?;

    let status = response.status();
    let mut final_url = response.url().clone();
    strip_fragment(&mut final_url);

    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: final_url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html(&content_type) {
        return Err(FetchError::NotHtml {
            url: final_url.to_string(),
            content_type,
        });
    }

    let body = response.text().await.map_err(|e| FetchError::Body {
        url: final_url.to_string(),
        message: e.to_string(),
    })?;

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        body,
    })
}

/// Classifies a reqwest send error into the fetch taxonomy
fn classify_send_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: "connection failed".to_string(),
        }
    } else if error.is_redirect() {
        FetchError::Network {
            url: url.to_string(),
            message: "redirect limit exceeded".to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Content types we parse as HTML
///
/// A missing Content-Type header is treated as HTML; servers that omit the
/// header overwhelmingly serve pages.
fn is_html(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}
