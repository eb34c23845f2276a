//! Cite-Harvest main entry point
//!
//! This is the command-line interface for the Cite-Harvest citation harvester.

use anyhow::Result;
use cite_harvest::config::{load_config_with_hash, Config};
use cite_harvest::crawler::{build_coordinator, stop_on_interrupt, CrawlOutcome};
use cite_harvest::merge::{collect_ris_files, merge_files};
use cite_harvest::output::{load_status, print_status, TracingSink};
use cite_harvest::storage::open_store;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Cite-Harvest: a resumable citation harvester
///
/// Cite-Harvest walks a paginated catalog one item at a time, downloads the
/// citation record of every item it finds, and merges the records into one
/// bundle with a report of the titles that never arrived.
#[derive(Parser, Debug)]
#[command(name = "cite-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resumable citation harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from this results page instead of the configured seed
    #[arg(long, value_name = "URL", conflicts_with_all = ["status", "merge"])]
    seed: Option<String>,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["status", "merge"])]
    dry_run: bool,

    /// Show the persisted state of the last harvest and exit
    #[arg(long, conflicts_with_all = ["dry_run", "merge"])]
    status: bool,

    /// Merge citation files (default: every .ris file in the download directory)
    #[arg(long, value_name = "RIS", num_args = 0.., conflicts_with_all = ["dry_run", "status"])]
    merge: Option<Vec<PathBuf>>,

    /// Numbered title list to audit the merge against (default: configured titles path)
    #[arg(long, value_name = "FILE", requires = "merge")]
    titles: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
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
        handle_dry_run(&config, cli.seed.as_deref());
    } else if cli.status {
        handle_status(&config)?;
    } else if let Some(files) = cli.merge {
        handle_merge(&config, files, cli.titles)?;
    } else {
        handle_harvest(&config, cli.seed.as_deref()).await?;
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
            0 => EnvFilter::new("cite_harvest=info,warn"),
            1 => EnvFilter::new("cite_harvest=debug,info"),
            2 => EnvFilter::new("cite_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config, seed: Option<&str>) {
    println!("=== Cite-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Inter-item delay: {}ms", config.crawler.inter_item_delay);
    println!("  Ready timeout: {}ms", config.crawler.ready_timeout);
    println!("  Settle delay: {}ms", config.crawler.settle_delay);
    println!("  Operation timeout: {}ms", config.crawler.operation_timeout);

    println!("\nExtraction:");
    println!("  Max attempts: {}", config.extraction.max_attempts);
    println!("  Retry delay: {}ms", config.extraction.retry_delay);
    println!("  Element timeout: {}ms", config.extraction.element_timeout);
    println!("  Request timeout: {}ms", config.extraction.request_timeout);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nAdapter:");
    println!("  Item selectors ({}):", config.adapter.item_selectors.len());
    for selector in &config.adapter.item_selectors {
        println!("    * {}", selector);
    }
    println!("  Next page: {}", config.adapter.next_page_selector);

    println!("\nOutput:");
    println!("  State database: {}", config.output.state_path);
    println!("  Downloads: {}", config.output.download_dir);
    println!("  Title list: {}", config.output.titles_path);
    println!("  Merged bundle: {}", config.output.merged_path);
    println!("  Report: {}", config.output.report_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start harvesting at {}",
        seed.unwrap_or(&config.catalog.seed_url)
    );
}

/// Handles the --status mode: shows the persisted harvest state
fn handle_status(config: &Config) -> Result<()> {
    println!("State database: {}\n", config.output.state_path);

    let store = open_store(Path::new(&config.output.state_path))?;
    let status = load_status(&store)?;
    print_status(&status);

    Ok(())
}

/// Handles the --merge mode: merges citation files and writes the audit report
fn handle_merge(config: &Config, files: Vec<PathBuf>, titles: Option<PathBuf>) -> Result<()> {
    let files = if files.is_empty() {
        collect_ris_files(Path::new(&config.output.download_dir))?
    } else {
        files
    };
    let titles = titles.unwrap_or_else(|| PathBuf::from(&config.output.titles_path));

    println!("=== Merging Citations ===\n");
    println!("Citation files: {}", files.len());
    println!("Title list: {}", titles.display());

    let result = merge_files(
        &files,
        &titles,
        Path::new(&config.output.merged_path),
        Path::new(&config.output.report_path),
    )?;

    println!("\nRecords merged: {}", result.record_count);
    println!(
        "Titles found: {} of {}",
        result.report.success_count, result.report.expected_count
    );
    println!("Titles missing: {}", result.report.missing_titles.len());
    println!("\n✓ Merged bundle written to: {}", config.output.merged_path);
    println!("✓ Report written to: {}", config.output.report_path);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, seed: Option<&str>) -> Result<()> {
    let seed = seed.unwrap_or(&config.catalog.seed_url);
    let mut coordinator = build_coordinator(config, Arc::new(TracingSink))?;

    // First Ctrl-C asks the coordinator to stop and tear down the run;
    // a second one exits even if a bounded call is still in flight
    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        let ctrl_c = || async { tokio::signal::ctrl_c().await.is_ok() };
        if stop_on_interrupt(stop, ctrl_c).await {
            std::process::exit(130);
        }
    });

    match coordinator.start(seed).await {
        Ok(CrawlOutcome::Completed { downloaded, titles }) => {
            tracing::info!(
                "Harvest completed: {} citations for {} titles",
                downloaded,
                titles
            );
            Ok(())
        }
        Ok(CrawlOutcome::Stopped { downloaded, titles }) => {
            tracing::info!(
                "Harvest stopped after {} citations ({} titles seen)",
                downloaded,
                titles
            );
            Ok(())
        }
        Ok(CrawlOutcome::Aborted { message }) => {
            tracing::error!("Harvest aborted: {}", message);
            Err(anyhow::anyhow!(message))
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
