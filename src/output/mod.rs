//! Output module for progress notifications and harvest artifacts
//!
//! This module handles:
//! - Progress events and the sinks that receive them
//! - Writing the numbered title ledger consumed by the merge step
//! - Reporting persisted run status

mod sinks;
pub mod status;
mod titles;
mod traits;

pub use sinks::{CollectingSink, TracingSink};
pub use status::{load_status, print_status, HarvestStatus};
pub use titles::{format_title_list, write_title_list};
pub use traits::{OutputError, OutputResult, ProgressEvent, ProgressSink};
