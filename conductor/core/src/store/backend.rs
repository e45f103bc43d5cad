//! Key-Value Backend Trait
//!
//! The persistence seam. The session snapshot is a single string value
//! stored under a single key, so any durable key-value store can stand in for
//! browser-style local storage without the controller noticing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by stores and backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// The backend refused the write because it is full
    #[error("Storage quota exceeded: {needed} bytes requested, {available} available")]
    QuotaExceeded {
        /// Bytes the write would occupy
        needed: usize,
        /// Bytes still free
        available: usize,
    },

    /// The key cannot be stored by this backend
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The stored snapshot could not be decoded
    #[error("Malformed snapshot: {0}")]
    Malformed(String),

    /// The snapshot could not be encoded
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key-value persistence backend
///
/// Implement this trait to persist sessions somewhere other than the
/// filesystem. Reads of a missing key return `Ok(None)`; removing a missing
/// key is not an error.
pub trait KeyValueBackend: Send {
    /// Get the backend name (e.g., "file", "memory")
    fn name(&self) -> &str;

    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the value stored under `key`
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}
