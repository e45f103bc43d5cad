//! Surface Events
//!
//! Events sent from a rendering surface to the
//! [`SessionController`](crate::SessionController).
//!
//! # Design Philosophy
//!
//! Surfaces only report what the user did. Whether a typed line becomes a
//! message, or a clear starts a new greeting, is decided by the controller.

use serde::{Deserialize, Serialize};

/// Events from a surface to the controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // User Input Events
    // ============================================
    /// User submitted a message
    UserMessage {
        /// Message content as entered
        content: String,
        /// How the text was produced
        origin: InputOrigin,
    },

    /// User asked to wipe the conversation
    ClearRequested,

    // ============================================
    // Lifecycle Events
    // ============================================
    /// Surface is going away
    QuitRequested,
}

impl SurfaceEvent {
    /// Shorthand for a typed message
    pub fn typed(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
            origin: InputOrigin::Typed,
        }
    }

    /// Shorthand for a dictated message
    pub fn dictated(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
            origin: InputOrigin::Dictated,
        }
    }
}

/// Where user input came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputOrigin {
    /// Keyboard entry
    Typed,
    /// Speech transcript from a dictation capability
    Dictated,
}
