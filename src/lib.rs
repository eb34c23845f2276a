//! Cite-Harvest: a resumable citation harvester
//!
//! This crate walks a paginated document catalog one item at a time, asks an
//! isolated render agent to download each item's citation record, and then
//! merges the downloaded records into a single bundle with an audit report of
//! the titles that never arrived.

pub mod adapter;
pub mod agent;
pub mod config;
pub mod crawler;
pub mod merge;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Cite-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("A crawl is already running")]
    AlreadyRunning,

    #[error("Malformed discovery payload: {0}")]
    Data(String),

    #[error("Render agent fault: {0}")]
    AgentFault(#[from] agent::AgentError),

    #[error("Persistence fault: {0}")]
    Persistence(#[from] storage::StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Merge error: {0}")]
    Merge(#[from] merge::MergeError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Cite-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlOutcome, CrawlPhase, CrawlState, Item, StopHandle};
pub use merge::{merge, AuditReport, CitationRecord, MergeResult};
pub use output::{ProgressEvent, ProgressSink};
pub use storage::{DownloadState, StateStore};
pub use url::item_key;
