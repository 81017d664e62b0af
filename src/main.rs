//! Tidemark main entry point
//!
//! This is the command-line interface for the tidemark crawler.

use clap::Parser;
use std::path::PathBuf;
use tidemark::config::load_config_with_hash;
use tidemark::crawler::crawl;
use tracing_subscriber::EnvFilter;

/// Tidemark: a domain-bounded text crawler
///
/// Tidemark crawls a single domain (and its subdomains) from a seed URL out
/// to a bounded link depth, extracting page text into a SQLite database for
/// later indexing.
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version = "1.0.0")]
#[command(about = "A domain-bounded text crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to crawl from
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Maximum link depth (overrides the configured default)
    #[arg(long, value_name = "N")]
    depth: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.seed.as_deref(), cli.depth);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let seed = cli
            .seed
            .ok_or_else(|| anyhow::anyhow!("--seed <URL> is required to start a crawl"))?;
        handle_crawl(&config, &seed, cli.depth).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidemark=info,warn"),
            1 => EnvFilter::new("tidemark=debug,info"),
            2 => EnvFilter::new("tidemark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &tidemark::config::Config, seed: Option<&str>, depth: Option<u32>) {
    println!("=== Tidemark Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", depth.unwrap_or(config.crawler.max_depth));
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Rate limit: {} req/s (burst {})",
        config.crawler.requests_per_second, config.crawler.rate_burst
    );
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_ms);
    println!("  Frontier bound: {}", config.crawler.max_frontier);

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    match seed {
        Some(seed) => println!("✓ Would crawl from seed: {}", seed),
        None => println!("  (pass --seed <URL> to start a crawl)"),
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &tidemark::config::Config) -> anyhow::Result<()> {
    use std::path::Path;
    use tidemark::output::{load_statistics, print_statistics};
    use tidemark::storage::SqliteStorage;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &tidemark::config::Config,
    seed: &str,
    depth: Option<u32>,
) -> anyhow::Result<()> {
    let report = crawl(config, seed, depth).await?;

    println!("Crawl finished in {:.2}s", report.elapsed.as_secs_f64());
    println!("  Unique URLs claimed: {}", report.unique_urls);
    println!("  Pages persisted:     {}", report.pages_persisted);
    println!("  Already persisted:   {}", report.already_persisted);
    println!("  Non-HTML skipped:    {}", report.not_html);
    println!("  Failed tasks:        {}", report.failed);
    if report.rejected_frontier > 0 {
        println!("  Dropped (frontier):  {}", report.rejected_frontier);
    }

    Ok(())
}
