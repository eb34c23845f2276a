//! Stop requests from outside the driver task

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle used to ask a running crawl to stop
///
/// The coordinator checks it after every settled operation and races it
/// against its delays; the actual teardown is always done by the
/// coordinator itself.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    signal: Arc<StopSignal>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Idempotent.
    pub fn stop(&self) {
        if !self.signal.requested.swap(true, Ordering::SeqCst) {
            tracing::info!("Stop requested");
        }
        self.signal.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.requested.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        loop {
            let notified = self.signal.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    /// Clears a previous request so the handle can serve the next run
    pub(crate) fn clear(&self) {
        self.signal.requested.store(false, Ordering::SeqCst);
    }
}

/// Turns interrupts into stop requests
///
/// The first interrupt asks the crawl to stop gracefully. Returns `true`
/// when a second interrupt arrives, meaning the caller should exit without
/// waiting for the teardown; `false` if the interrupt source went away.
pub async fn stop_on_interrupt<F, Fut>(handle: StopHandle, mut interrupt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !interrupt().await {
        return false;
    }
    tracing::warn!("Interrupted; stopping after the current step (interrupt again to exit now)");
    handle.stop();

    if !interrupt().await {
        return false;
    }
    tracing::error!("Interrupted again; exiting without cleanup");
    true
}
