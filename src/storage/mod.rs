//! Storage module for persisting harvest state
//!
//! This module handles the durable key/value state the orchestrator writes at
//! well-defined transition points:
//! - `downloadState`: progress counters, readable by a separate status process
//! - `titles`: the title ledger accumulated so far
//!
//! Both keys are cleared when a run completes or is stopped.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Key holding the serialized [`DownloadState`]
pub const DOWNLOAD_STATE_KEY: &str = "downloadState";

/// Key holding the title ledger as a JSON array of strings
pub const TITLES_KEY: &str = "titles";

/// Opens the SQLite state store at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteStateStore> {
    SqliteStateStore::new(path)
}

/// Progress counters persisted for cross-process status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadState {
    pub is_downloading: bool,
    pub current: u64,
    pub total: u64,
}

impl DownloadState {
    /// Completion percentage, or None when the total is still unknown
    pub fn percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.current as f64 / self.total as f64) * 100.0)
    }
}

/// Writes the progress counters
pub fn save_download_state(store: &mut dyn StateStore, state: &DownloadState) -> StorageResult<()> {
    let value = serde_json::to_value(state)?;
    store.set(DOWNLOAD_STATE_KEY, &value)
}

/// Reads the progress counters left by the current or a previous process
pub fn load_download_state(store: &dyn StateStore) -> StorageResult<Option<DownloadState>> {
    match store.get(DOWNLOAD_STATE_KEY)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Writes the title ledger
pub fn save_titles(store: &mut dyn StateStore, titles: &[String]) -> StorageResult<()> {
    let value = serde_json::to_value(titles)?;
    store.set(TITLES_KEY, &value)
}

/// Reads the title ledger
pub fn load_titles(store: &dyn StateStore) -> StorageResult<Vec<String>> {
    match store.get(TITLES_KEY)? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(Vec::new()),
    }
}

/// Removes every key a run writes
pub fn clear_run_state(store: &mut dyn StateStore) -> StorageResult<()> {
    store.remove(DOWNLOAD_STATE_KEY)?;
    store.remove(TITLES_KEY)?;
    Ok(())
}
