//! Storage traits and error types
//!
//! This module defines the key/value contract the orchestrator persists its
//! reporting state through, and the errors a backend may raise.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key/value persistence
///
/// Only the get/set/remove contract is relied upon. Values are JSON so the
/// same keys can be read by another process for status reporting.
pub trait StateStore: Send {
    /// Reads the value stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &Value) -> StorageResult<()>;

    /// Deletes `key`; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// Lists every key currently stored
    fn keys(&self) -> StorageResult<Vec<String>>;
}
