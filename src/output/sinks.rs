//! Progress sink implementations

use crate::output::traits::{ProgressEvent, ProgressSink};
use std::sync::{Arc, Mutex};

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn notify(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Progress { current, total } => {
                if total > 0 {
                    let percent = (current as f64 / total as f64) * 100.0;
                    tracing::info!("Downloaded {} of {} ({:.1}%)", current, total, percent);
                } else {
                    tracing::info!("Downloaded {}", current);
                }
            }
            ProgressEvent::Error { message } => tracing::warn!("Harvest error: {}", message),
            ProgressEvent::Complete {} => tracing::info!("Harvest complete"),
        }
    }
}

/// Keeps every event in memory, in order
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for CollectingSink {
    fn notify(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        let shared = sink.clone();

        sink.notify(ProgressEvent::Progress {
            current: 1,
            total: 2,
        });
        sink.notify(ProgressEvent::Complete {});

        let events = shared.events();
        assert_eq!(events.len(), 2);
        assert!(events[1].is_complete());
    }
}
