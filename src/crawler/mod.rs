//! Crawler module for catalog harvesting
//!
//! This module contains the core harvesting logic, including:
//! - The crawl state machine and its transitions
//! - The coordinator that drives agents through discovery and extraction
//! - Stop requests from other tasks

mod coordinator;
mod state;
mod stop;

pub use coordinator::{Coordinator, CrawlOutcome};
pub use state::{CrawlPhase, CrawlState, Item};
pub use stop::{stop_on_interrupt, StopHandle};

use crate::agent::HttpRenderAgent;
use crate::config::Config;
use crate::output::{ProgressSink, TracingSink};
use crate::storage::open_store;
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Builds a coordinator wired to the HTTP agent and the SQLite state store
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `sink` - Receiver of progress notifications
pub fn build_coordinator(
    config: &Config,
    sink: Arc<dyn ProgressSink>,
) -> Result<Coordinator, HarvestError> {
    let agent = HttpRenderAgent::from_config(config)?;
    let store = open_store(Path::new(&config.output.state_path))?;

    Ok(Coordinator::new(
        config.crawler.clone(),
        &config.output.titles_path,
        Arc::new(agent),
        Box::new(store),
        sink,
    ))
}

/// Runs a complete harvest
///
/// This is the main entry point for a harvest. It will:
/// 1. Open the state database
/// 2. Build the HTTP agent and the page adapter
/// 3. Discover items page by page, following pagination
/// 4. Download one citation per item
/// 5. Write the numbered title list
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `seed_url` - First results page; defaults to the configured seed
pub async fn crawl(config: &Config, seed_url: Option<&str>) -> Result<CrawlOutcome, HarvestError> {
    let mut coordinator = build_coordinator(config, Arc::new(TracingSink))?;
    let seed = seed_url.unwrap_or(&config.catalog.seed_url);
    coordinator.start(seed).await
}
