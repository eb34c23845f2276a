//! Bounded waiting
//!
//! Both waits here are plain futures: dropping one cancels it, so callers
//! can race them against a stop request.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

/// Polls `probe` every `interval` until it yields a value or `timeout` elapses
///
/// The probe runs at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return None;
        }

        sleep(interval.min(deadline - now)).await;
    }
}

/// Waits for a watched value to satisfy `ready`, up to `timeout`
///
/// Returns false on timeout or when the sender is gone before the value
/// became ready.
pub async fn notified_until<T, F>(rx: &mut watch::Receiver<T>, timeout: Duration, ready: F) -> bool
where
    F: FnMut(&T) -> bool,
{
    matches!(
        tokio::time::timeout(timeout, rx.wait_for(ready)).await,
        Ok(Ok(_))
    )
}
