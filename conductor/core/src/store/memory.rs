//! In-memory key-value store
//!
//! Clones share the same map, so a test can keep a handle, inspect or
//! corrupt the stored snapshot, and observe what the controller wrote.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::backend::{KeyValueBackend, StoreError};

/// Shared in-memory backend with an optional byte quota
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    /// Create an unbounded backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects writes beyond `quota_bytes` in total
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Read a raw value without going through the trait
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Write a raw value, bypassing the quota
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.lock().insert(key.into(), value.into());
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl KeyValueBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();

        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let available = quota.saturating_sub(used);
            if value.len() > available {
                return Err(StoreError::QuotaExceeded {
                    needed: value.len(),
                    available,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
