//! Status reporting from the state database
//!
//! A harvest persists its counters as it goes, so another process (or the
//! same binary after a crash) can report how far the last run got.

use crate::storage::{load_download_state, load_titles, DownloadState, StateStore};
use crate::HarvestError;

/// Snapshot of the persisted run state
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestStatus {
    /// Counters of the last run, if one left any behind
    pub download: Option<DownloadState>,

    /// Number of titles in the persisted ledger
    pub titles_recorded: usize,
}

impl HarvestStatus {
    /// True when a run was interrupted without completing or stopping
    pub fn is_interrupted(&self) -> bool {
        self.download.map(|d| d.is_downloading).unwrap_or(false)
    }
}

/// Loads the status snapshot from a store
pub fn load_status(store: &dyn StateStore) -> Result<HarvestStatus, HarvestError> {
    let download = load_download_state(store)?;
    let titles_recorded = load_titles(store)?.len();

    Ok(HarvestStatus {
        download,
        titles_recorded,
    })
}

/// Prints a status snapshot to stdout
pub fn print_status(status: &HarvestStatus) {
    println!("=== Harvest Status ===\n");

    match status.download {
        Some(state) if state.is_downloading => {
            println!("A harvest is in progress (or was interrupted).");
            match state.percent() {
                Some(percent) => println!(
                    "  Processed {} of {} items ({:.1}%)",
                    state.current, state.total, percent
                ),
                None => println!("  Processed {} items", state.current),
            }
        }
        Some(state) => {
            println!("No harvest running.");
            println!("  Last counters: {} of {}", state.current, state.total);
        }
        None => println!("No harvest running."),
    }

    println!("  Titles recorded: {}", status.titles_recorded);

    if status.is_interrupted() {
        println!();
        println!("Note: the work queue is not persisted; start a new harvest to continue.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{save_download_state, save_titles, MemoryStateStore};

    #[test]
    fn test_empty_store() {
        let store = MemoryStateStore::new();
        let status = load_status(&store).unwrap();

        assert_eq!(status.download, None);
        assert_eq!(status.titles_recorded, 0);
        assert!(!status.is_interrupted());
    }

    #[test]
    fn test_interrupted_run() {
        let mut store = MemoryStateStore::new();
        save_download_state(
            &mut store,
            &DownloadState {
                is_downloading: true,
                current: 7,
                total: 20,
            },
        )
        .unwrap();
        save_titles(&mut store, &["A".to_string(), "B".to_string()]).unwrap();

        let status = load_status(&store).unwrap();
        assert!(status.is_interrupted());
        assert_eq!(status.titles_recorded, 2);
    }
}
