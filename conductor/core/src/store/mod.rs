//! Session Persistence
//!
//! Saves and restores the message sequence through a [`KeyValueBackend`].
//!
//! # Snapshot Format
//!
//! The snapshot is a JSON array stored under a single key:
//!
//! ```json
//! [
//!   {"id": "msg_…", "text": "Hello", "author": "user", "timestamp": "2024-05-01T09:30:00.123Z"}
//! ]
//! ```
//!
//! A missing snapshot is an empty session. A snapshot with any malformed
//! entry is rejected as a whole; there is no partial recovery.
//!
//! # Usage
//!
//! ```ignore
//! use parley_core::store::{MemoryBackend, PersistentStore};
//!
//! let mut store = PersistentStore::new(MemoryBackend::new(), "chatbot-messages");
//! store.save(&messages)?;
//! assert_eq!(store.load(), messages);
//! ```

mod backend;
mod file;
mod memory;

pub use backend::{KeyValueBackend, StoreError};
pub use file::{default_data_dir, is_valid_storage_key, FileBackend};
pub use memory::MemoryBackend;

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::{Author, MessageId};
use crate::session::ChatMessage;

/// Default storage key for the snapshot
pub const DEFAULT_STORAGE_KEY: &str = "chatbot-messages";

/// One entry of the persisted snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Message ID
    pub id: String,
    /// Message content
    pub text: String,
    /// Message author
    pub author: Author,
    /// ISO-8601 timestamp with millisecond precision
    pub timestamp: String,
}

impl From<&ChatMessage> for StoredMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.as_str().to_string(),
            text: message.text.clone(),
            author: message.author,
            timestamp: message
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl TryFrom<StoredMessage> for ChatMessage {
    type Error = StoreError;

    fn try_from(stored: StoredMessage) -> Result<Self, Self::Error> {
        if stored.id.is_empty() {
            return Err(StoreError::Malformed("message with empty id".to_string()));
        }
        let timestamp = DateTime::parse_from_rfc3339(&stored.timestamp)
            .map_err(|e| {
                StoreError::Malformed(format!(
                    "bad timestamp {:?} on {}: {e}",
                    stored.timestamp, stored.id
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: MessageId::from_raw(stored.id),
            text: stored.text,
            author: stored.author,
            timestamp,
            placeholder: false,
        })
    }
}

/// Message sequence persistence over a key-value backend
#[derive(Debug)]
pub struct PersistentStore<B: KeyValueBackend> {
    backend: B,
    key: String,
}

impl<B: KeyValueBackend> PersistentStore<B> {
    /// Create a store writing under `key`
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Storage key in use
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the snapshot, reporting why it could not be used
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the snapshot is malformed.
    /// A missing snapshot is `Ok(vec![])`.
    pub fn try_load(&self) -> Result<Vec<ChatMessage>, StoreError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(Vec::new());
        };

        let stored: Vec<StoredMessage> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Malformed(e.to_string()))?;

        let mut seen = HashSet::with_capacity(stored.len());
        let mut messages = Vec::with_capacity(stored.len());
        for entry in stored {
            if !seen.insert(entry.id.clone()) {
                return Err(StoreError::Malformed(format!("duplicate id {}", entry.id)));
            }
            messages.push(ChatMessage::try_from(entry)?);
        }

        Ok(messages)
    }

    /// Load the snapshot, falling back to an empty sequence
    ///
    /// Corruption and backend failures are logged, never returned.
    pub fn load(&self) -> Vec<ChatMessage> {
        match self.try_load() {
            Ok(messages) => {
                tracing::debug!(
                    key = %self.key,
                    backend = self.backend.name(),
                    count = messages.len(),
                    "Loaded session snapshot"
                );
                messages
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    backend = self.backend.name(),
                    error = %e,
                    "Discarding unreadable session snapshot"
                );
                Vec::new()
            }
        }
    }

    /// Overwrite the snapshot with `messages`
    ///
    /// Placeholders are never written.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the backend write fails. The caller
    /// decides whether that matters; the in-memory session is unaffected.
    pub fn save(&mut self, messages: &[ChatMessage]) -> Result<(), StoreError> {
        let stored: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| !m.placeholder)
            .map(StoredMessage::from)
            .collect();
        let raw = serde_json::to_string(&stored)?;
        self.backend.set(&self.key, &raw)?;

        tracing::trace!(key = %self.key, count = stored.len(), "Saved session snapshot");
        Ok(())
    }

    /// Remove the snapshot entirely
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot remove the value.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)
    }
}
