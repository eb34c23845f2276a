//! Configuration module for Cite-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cite_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvest starts at: {}", config.catalog.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AdapterConfig, CatalogConfig, Config, ControlSelectors, CrawlerConfig, ExtractionConfig,
    OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
