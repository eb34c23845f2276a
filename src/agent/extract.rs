//! Citation extraction routine
//!
//! Obtaining a citation file takes two clicks: the cite control opens the
//! citation panel, then the download control inside it triggers the file.
//! Either control may render late, so each is polled for with a bounded
//! wait, and the whole sequence is retried a bounded number of times. Only
//! the final outcome leaves this module.

use super::wait::poll_until;
use super::{AgentError, AgentResult, ExtractionOutcome};
use crate::config::{ControlSelectors, ExtractionConfig};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;

/// The page operations the extraction routine needs
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// True if an element matching `selector` is currently present
    async fn has_control(&self, selector: &str) -> bool;

    /// Activates the control (opens whatever it points at)
    async fn click(&self, selector: &str) -> AgentResult<()>;

    /// Activates a download control and stores the downloaded file
    async fn download(&self, selector: &str) -> AgentResult<()>;

    /// Returns to the item page the extraction started on
    async fn restore(&self);
}

/// Retry and timing parameters of the extraction routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub element_timeout: Duration,
    pub poll_interval: Duration,
    pub download_settle: Duration,
    pub request_timeout: Duration,
}

impl From<&ExtractionConfig> for ExtractionPolicy {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay),
            element_timeout: Duration::from_millis(config.element_timeout),
            poll_interval: Duration::from_millis(config.poll_interval),
            download_settle: Duration::from_millis(config.download_settle),
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

/// Runs the cite/download sequence against a page
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationExtractor {
    policy: ExtractionPolicy,
}

impl CitationExtractor {
    pub fn new(policy: ExtractionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    /// Runs up to `max_attempts` attempts and reports the final outcome
    pub async fn extract<S>(&self, surface: &S, controls: &ControlSelectors) -> ExtractionOutcome
    where
        S: ControlSurface + ?Sized,
    {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.policy.max_attempts {
            match self.attempt(surface, controls).await {
                Ok(()) => {
                    tracing::debug!("Citation extracted on attempt {}", attempt);
                    return ExtractionOutcome::succeeded();
                }
                Err(e) => {
                    tracing::warn!(
                        "Extraction attempt {}/{} failed: {}",
                        attempt,
                        self.policy.max_attempts,
                        e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.policy.max_attempts {
                sleep(self.policy.retry_delay).await;
            }
        }

        ExtractionOutcome::failed(format!(
            "gave up after {} attempts: {}",
            self.policy.max_attempts, last_error
        ))
    }

    async fn attempt<S>(&self, surface: &S, controls: &ControlSelectors) -> AgentResult<()>
    where
        S: ControlSurface + ?Sized,
    {
        // Every attempt runs the full sequence from the item page
        surface.restore().await;

        self.wait_for_control(surface, &controls.cite).await?;
        surface.click(&controls.cite).await?;

        self.wait_for_control(surface, &controls.download).await?;
        surface.download(&controls.download).await?;

        sleep(self.policy.download_settle).await;
        Ok(())
    }

    async fn wait_for_control<S>(&self, surface: &S, selector: &str) -> AgentResult<()>
    where
        S: ControlSurface + ?Sized,
    {
        let found = poll_until(
            self.policy.element_timeout,
            self.policy.poll_interval,
            move || async move { surface.has_control(selector).await.then_some(()) },
        )
        .await;

        found.ok_or_else(|| AgentError::ControlNotFound {
            selector: selector.to_string(),
        })
    }
}
