//! Render agents
//!
//! A render agent is an ephemeral, isolated page context: it loads one URL,
//! reports when the document is ready, and runs either discovery or citation
//! extraction against it. The coordinator opens at most one at a time and
//! always closes it before moving on.

mod extract;
mod http;
pub mod wait;

pub use extract::{CitationExtractor, ControlSurface, ExtractionPolicy};
pub use http::{build_http_client, HttpRenderAgent};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while talking to a render agent
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Unknown agent handle: {0}")]
    UnknownHandle(AgentHandle),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Control not found: {selector}")]
    ControlNotFound { selector: String },

    #[error("Page failed to load: {0}")]
    LoadFailed(String),

    #[error("Citation download failed: {0}")]
    Download(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for agent operations
pub type AgentResult<T> = std::result::Result<T, AgentError>;

/// Opaque identifier of an open agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentHandle(u64);

impl AgentHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Final result of the extraction routine for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl ExtractionOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// An isolated execution context able to load a URL and run page logic on it
///
/// Implementations must make `wait_ready` resolve once the document is
/// loaded or has failed to load; callers bound every call with a timeout.
#[async_trait]
pub trait RenderAgent: Send + Sync {
    /// Starts loading `url` in a fresh context
    async fn open(&self, url: &Url) -> AgentResult<AgentHandle>;

    /// Resolves when the document behind `handle` is ready
    async fn wait_ready(&self, handle: AgentHandle) -> AgentResult<()>;

    /// Runs discovery and returns the discovery payload
    async fn run_discovery(&self, handle: AgentHandle) -> AgentResult<serde_json::Value>;

    /// Runs the citation extraction routine
    async fn run_extraction(&self, handle: AgentHandle) -> AgentResult<ExtractionOutcome>;

    /// Tears the context down
    async fn close(&self, handle: AgentHandle) -> AgentResult<()>;
}
