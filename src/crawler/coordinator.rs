//! Crawler coordinator - main harvest orchestration logic
//!
//! The coordinator owns the [`CrawlState`] of a run and is the only component
//! that sequences render agent lifecycles. Starting from a seed results
//! page it:
//! - Opens an agent on the page and runs discovery
//! - Dispatches each discovered item to a fresh agent for extraction
//! - Follows the next-page link once the page's items are exhausted
//! - Persists progress and the title ledger as it goes
//! - Writes the title list and clears persisted state on completion
//!
//! At most one agent is open at any instant, and every agent call is bounded
//! by a timeout so a lost page cannot stall the run.

use crate::adapter::Discovery;
use crate::agent::{AgentError, AgentHandle, AgentResult, RenderAgent};
use crate::config::CrawlerConfig;
use crate::crawler::state::{CrawlPhase, CrawlState};
use crate::crawler::stop::StopHandle;
use crate::output::{write_title_list, ProgressEvent, ProgressSink};
use crate::storage::{
    clear_run_state, load_download_state, save_download_state, save_titles, DownloadState,
    StateStore,
};
use crate::HarvestError;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use url::Url;

/// How a call to [`Coordinator::start`] ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// Every page and item was processed
    Completed { downloaded: u64, titles: usize },

    /// A stop request ended the run early
    Stopped { downloaded: u64, titles: usize },

    /// The run could not begin
    Aborted { message: String },
}

/// Main harvest coordinator
pub struct Coordinator {
    timing: CrawlerConfig,
    titles_path: PathBuf,
    agent: Arc<dyn RenderAgent>,
    store: Box<dyn StateStore>,
    sink: Arc<dyn ProgressSink>,
    state: CrawlState,
    stop_handle: StopHandle,
}

impl Coordinator {
    /// Creates an idle coordinator
    ///
    /// # Arguments
    ///
    /// * `timing` - Delays and timeouts of the crawl loop
    /// * `titles_path` - Where the numbered title list is written on completion
    /// * `agent` - Render agent used for discovery and extraction
    /// * `store` - Persistence for progress and the title ledger
    /// * `sink` - Receiver of progress notifications
    pub fn new(
        timing: CrawlerConfig,
        titles_path: impl Into<PathBuf>,
        agent: Arc<dyn RenderAgent>,
        store: Box<dyn StateStore>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            timing,
            titles_path: titles_path.into(),
            agent,
            store,
            sink,
            state: CrawlState::new(),
            stop_handle: StopHandle::new(),
        }
    }

    /// Current run state
    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Handle that asks the running crawl to stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Reads the progress counters a previous run left behind
    pub fn previous_status(store: &dyn StateStore) -> Result<Option<DownloadState>, HarvestError> {
        Ok(load_download_state(store)?)
    }

    /// Runs a harvest from `seed_url` until it completes or is stopped
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutcome)` - How the run ended
    /// * `Err(HarvestError::AlreadyRunning)` - A run is in progress; nothing changed
    pub async fn start(&mut self, seed_url: &str) -> Result<CrawlOutcome, HarvestError> {
        if self.state.is_running() {
            tracing::warn!("Start ignored: a harvest is already running");
            return Err(HarvestError::AlreadyRunning);
        }

        self.stop_handle.clear();
        self.discard_stale_run();

        let seed = match Url::parse(seed_url.trim()) {
            Ok(seed) => seed,
            Err(e) => {
                let message = format!("Invalid seed URL '{}': {}", seed_url, e);
                tracing::error!("{}", message);
                self.sink.notify(ProgressEvent::error(message.clone()));
                self.clear_persisted();
                return Ok(CrawlOutcome::Aborted { message });
            }
        };

        tracing::info!("Starting harvest at {}", seed);
        self.state.begin(seed.to_string());

        self.drive().await
    }

    /// Stops the current run and releases everything it holds
    ///
    /// Closes the active agent (failures are reported, never propagated),
    /// clears persisted state and resets to idle. A no-op when idle.
    pub async fn stop(&mut self) {
        if !self.state.is_running() {
            tracing::debug!("Stop ignored: no harvest running");
            return;
        }

        if let Some(e) = self.close_active().await {
            self.sink
                .notify(ProgressEvent::error(format!("Failed to close agent: {}", e)));
        }

        self.clear_persisted();
        self.state.reset();
        tracing::info!("Harvest stopped");
    }

    /// Applies a discovery payload to the run
    ///
    /// Ignored when no run is active. A malformed payload is reported through
    /// the sink and leaves the state untouched.
    pub fn on_discovery_result(&mut self, payload: &Value) -> Result<(), HarvestError> {
        if !self.state.is_running() {
            tracing::debug!("Discovery result ignored: no harvest running");
            return Ok(());
        }

        let discovery = match parse_discovery(payload) {
            Ok(discovery) => discovery,
            Err(e) => {
                tracing::warn!("{}", e);
                self.sink.notify(ProgressEvent::error(e.to_string()));
                return Err(e);
            }
        };

        let accepted = self.state.apply_discovery(discovery);
        tracing::info!(
            "Accepted {} new items ({} titles so far, expecting {})",
            accepted,
            self.state.titles().len(),
            self.state.expected_total()
        );

        if let Err(e) = save_titles(self.store.as_mut(), self.state.titles()) {
            tracing::error!("Failed to persist title ledger: {}", e);
        }

        self.state.settle_phase();
        Ok(())
    }

    /// Records the outcome of the in-flight extraction
    ///
    /// Closes the active agent, then counts and persists a success or
    /// reports a failure. Ignored when no run is active.
    pub async fn on_extraction_result(&mut self, success: bool) {
        if !self.state.is_running() {
            tracing::debug!("Extraction result ignored: no harvest running");
            return;
        }

        self.close_active().await;
        let item = self.state.take_active_item();

        if success {
            let current = self.state.record_download();
            let total = self.state.expected_total();

            let progress = DownloadState {
                is_downloading: true,
                current,
                total,
            };
            if let Err(e) = save_download_state(self.store.as_mut(), &progress) {
                tracing::error!("Failed to persist progress: {}", e);
            }

            self.sink.notify(ProgressEvent::Progress { current, total });
        } else {
            let message = match item {
                Some(item) => format!("Citation download failed for \"{}\"", item.title),
                None => "Citation download failed".to_string(),
            };
            self.sink.notify(ProgressEvent::error(message));
        }
    }

    async fn drive(&mut self) -> Result<CrawlOutcome, HarvestError> {
        loop {
            if self.stop_handle.is_stopped() {
                let outcome = CrawlOutcome::Stopped {
                    downloaded: self.state.downloaded_count(),
                    titles: self.state.titles().len(),
                };
                self.stop().await;
                return Ok(outcome);
            }

            match self.state.phase().clone() {
                CrawlPhase::Idle => {
                    return Ok(CrawlOutcome::Stopped {
                        downloaded: 0,
                        titles: 0,
                    })
                }
                CrawlPhase::Discovering(page_url) => self.discover(&page_url).await,
                CrawlPhase::DispatchingItem => self.dispatch_next().await,
                CrawlPhase::Paginating => {
                    if let Some(next) = self.state.advance_page() {
                        tracing::info!("Advancing to next page {}", next);
                    } else {
                        self.state.settle_phase();
                    }
                }
                CrawlPhase::Complete => return Ok(self.complete().await),
            }
        }
    }

    async fn discover(&mut self, page_url: &str) {
        let payload = match Url::parse(page_url) {
            Ok(url) => {
                tracing::info!("Discovering items on {}", url);
                self.run_discovery(&url).await
            }
            Err(e) => Err(AgentError::Navigation {
                url: page_url.to_string(),
                message: e.to_string(),
            }),
        };

        match payload {
            Ok(payload) => {
                if self.on_discovery_result(&payload).is_ok() {
                    return;
                }
            }
            Err(e) => {
                let message = format!("Discovery on {} failed: {}", page_url, e);
                tracing::warn!("{}", message);
                self.sink.notify(ProgressEvent::error(message));
            }
        }

        // Nothing was applied; move on with whatever remains
        self.state.settle_phase();
    }

    async fn run_discovery(&mut self, url: &Url) -> AgentResult<Value> {
        let handle = self.open_agent(url).await?;
        self.await_ready(handle).await;

        let payload = self.bounded("discovery", self.agent.run_discovery(handle)).await;
        self.close_active().await;
        payload
    }

    async fn dispatch_next(&mut self) {
        let Some(item) = self.state.next_item() else {
            self.state.settle_phase();
            return;
        };

        tracing::info!("Dispatching \"{}\" ({})", item.title, item.url);

        let opened = match Url::parse(&item.url) {
            Ok(url) => self.open_agent(&url).await,
            Err(e) => Err(AgentError::Navigation {
                url: item.url.clone(),
                message: e.to_string(),
            }),
        };

        match opened {
            Ok(handle) => {
                self.await_ready(handle).await;
                if self.pause(self.timing.settle_delay()).await {
                    return;
                }

                let success = match self
                    .bounded("extraction", self.agent.run_extraction(handle))
                    .await
                {
                    Ok(outcome) => {
                        if let Some(error) = &outcome.error {
                            tracing::warn!("Extraction of {} failed: {}", item.url, error);
                        }
                        outcome.success
                    }
                    Err(e) => {
                        tracing::warn!("Agent fault while extracting {}: {}", item.url, e);
                        false
                    }
                };

                self.on_extraction_result(success).await;
            }
            Err(e) => {
                self.state.take_active_item();
                let message = format!("Could not open \"{}\": {}", item.title, e);
                tracing::warn!("{}", message);
                self.sink.notify(ProgressEvent::error(message));
            }
        }

        if self.pause(self.timing.inter_item_delay()).await {
            return;
        }
        self.state.settle_phase();
    }

    async fn complete(&mut self) -> CrawlOutcome {
        self.close_active().await;

        let downloaded = self.state.downloaded_count();
        let titles = self.state.titles().len();

        match write_title_list(self.state.titles(), &self.titles_path) {
            Ok(()) => tracing::info!(
                "Wrote {} titles to {}",
                titles,
                self.titles_path.display()
            ),
            Err(e) => {
                let message = format!(
                    "Failed to write title list {}: {}",
                    self.titles_path.display(),
                    e
                );
                tracing::error!("{}", message);
                self.sink.notify(ProgressEvent::error(message));
            }
        }

        self.clear_persisted();
        self.sink.notify(ProgressEvent::Complete {});
        tracing::info!(
            "Harvest complete: {} of {} citations downloaded",
            downloaded,
            titles
        );

        self.state.reset();
        CrawlOutcome::Completed { downloaded, titles }
    }

    async fn open_agent(&mut self, url: &Url) -> AgentResult<AgentHandle> {
        if let Some(stale) = self.state.active_handle() {
            tracing::warn!("{} still open before opening a new agent", stale);
            self.close_active().await;
        }

        let handle = self.bounded("open", self.agent.open(url)).await?;
        self.state.set_active_handle(handle);
        Ok(handle)
    }

    /// Waits for the document; a timeout is logged and treated as ready
    async fn await_ready(&self, handle: AgentHandle) {
        let wait = self.timing.ready_timeout();
        match timeout(wait, self.agent.wait_ready(handle)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("{} did not become ready: {}", handle, e),
            Err(_) => tracing::warn!("{} not ready after {:?}, continuing anyway", handle, wait),
        }
    }

    /// Closes the active agent, if any, returning the failure
    async fn close_active(&mut self) -> Option<AgentError> {
        let handle = self.state.take_active_handle()?;
        match self.bounded("close", self.agent.close(handle)).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Failed to close {}: {}", handle, e);
                Some(e)
            }
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = AgentResult<T>>,
    ) -> AgentResult<T> {
        let after = self.timing.operation_timeout();
        timeout(after, call)
            .await
            .unwrap_or(Err(AgentError::Timeout { operation, after }))
    }

    /// Sleeps for `delay`; returns true if a stop was requested meanwhile
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return self.stop_handle.is_stopped();
        }

        tokio::select! {
            _ = sleep(delay) => self.stop_handle.is_stopped(),
            _ = self.stop_handle.stopped() => true,
        }
    }

    fn discard_stale_run(&mut self) {
        match load_download_state(&*self.store) {
            Ok(Some(previous)) if previous.is_downloading => {
                tracing::warn!(
                    "Previous harvest ended at {} of {} without finishing; starting over",
                    previous.current,
                    previous.total
                );
                self.clear_persisted();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not read previous harvest state: {}", e),
        }
    }

    fn clear_persisted(&mut self) {
        if let Err(e) = clear_run_state(self.store.as_mut()) {
            tracing::error!("Failed to clear persisted state: {}", e);
        }
    }
}

/// Validates and decodes a discovery payload
fn parse_discovery(payload: &Value) -> Result<Discovery, HarvestError> {
    if !payload.get("items").map(Value::is_array).unwrap_or(false) {
        return Err(HarvestError::Data(
            "discovery payload has no `items` array".to_string(),
        ));
    }

    let mut discovery: Discovery = serde_json::from_value(payload.clone())
        .map_err(|e| HarvestError::Data(e.to_string()))?;

    discovery.next_page_url = discovery
        .next_page_url
        .filter(|next| !next.trim().is_empty());

    Ok(discovery)
}
