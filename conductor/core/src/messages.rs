//! Surface Messages
//!
//! Messages sent from the [`SessionController`](crate::SessionController) to
//! the renderer, plus the identifier and enum types they carry.
//!
//! # Design Philosophy
//!
//! The renderer is a read-only consumer. It never mutates the conversation;
//! it only displays what the controller tells it. Every change to the message
//! sequence, the loading flag, or a reveal in progress is announced here, and
//! a full [`SessionView`](crate::controller::SessionView) can be pulled at any
//! time to resynchronize.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::ChatMessage;

/// Messages from the controller to the renderer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SurfaceMessage {
    // ============================================
    // Conversation Messages
    // ============================================
    /// Full sequence, sent on startup
    Snapshot {
        /// Messages in insertion order
        messages: Vec<ChatMessage>,
    },

    /// A message was appended at the end of the sequence
    Appended {
        /// The new message
        message: ChatMessage,
    },

    /// A placeholder was replaced in place by its final message
    Replaced {
        /// The placeholder that no longer exists
        placeholder_id: MessageId,
        /// The final assistant message at the same position
        message: ChatMessage,
    },

    /// The visible prefix of a revealing message grew
    Reveal {
        /// Message being revealed
        id: MessageId,
        /// Prefix to display
        visible: String,
        /// Characters revealed so far
        revealed: usize,
        /// Total characters in the message
        total: usize,
    },

    /// The whole sequence was discarded
    Cleared,

    // ============================================
    // System Messages
    // ============================================
    /// Loading flag changed (input should be disabled while true)
    Loading {
        /// Whether a response is in flight
        loading: bool,
    },

    /// Controller state change
    State {
        /// The new state
        state: SessionState,
    },

    /// Notification for the user (rejected input and similar)
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },
}

/// Message identifier
///
/// Opaque and unique across processes, since restored snapshots keep the ids
/// written by earlier runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        Self(format!("msg_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who wrote a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    /// Typed or dictated input
    User,
    /// Simulated assistant
    Assistant,
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Controller operational states
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No request in flight, input accepted
    Idle,
    /// Waiting on the response generator, input disabled
    Awaiting,
    /// Sequence discarded, greeting pending
    Clearing,
}

impl SessionState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Awaiting => "Thinking...",
            Self::Clearing => "Clearing...",
        }
    }

    /// Whether `send` is accepted in this state
    #[must_use]
    pub fn accepts_input(&self) -> bool {
        !matches!(self, Self::Awaiting)
    }
}
