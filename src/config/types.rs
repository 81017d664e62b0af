use serde::Deserialize;

/// Main configuration structure for tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed URL (CLI `--depth` overrides this)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Fixed size of the worker pool
    pub workers: u32,

    /// Token-bucket refill rate shared by all workers
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Token-bucket capacity (maximum burst of back-to-back requests)
    #[serde(rename = "rate-burst")]
    pub rate_burst: u32,

    /// Per-fetch timeout (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum number of outstanding tasks; submissions beyond this are rejected
    #[serde(rename = "max-frontier")]
    pub max_frontier: u32,

    /// Grace period for workers to finish after quiescence (milliseconds)
    #[serde(rename = "shutdown-grace-ms")]
    pub shutdown_grace_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value sent with every request
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
