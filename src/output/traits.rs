//! Output traits and types
//!
//! This module defines the progress notification contract and the errors
//! raised while writing harvest artifacts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Notification emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// An item was downloaded
    Progress { current: u64, total: u64 },

    /// A non-fatal problem occurred; the run carries on unless it cannot
    Error { message: String },

    /// The run finished and all resources were released
    Complete {},
}

impl ProgressEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete {})
    }
}

/// Receiver of progress notifications
///
/// Delivery is fire-and-forget: a sink must not block and must not fail the
/// caller. Implementations are expected to swallow their own errors.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}
