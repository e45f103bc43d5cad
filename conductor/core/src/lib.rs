//! Parley Core - Headless Conversation Core for a Chat Widget
//!
//! This crate owns everything about a chat conversation except drawing it:
//! the ordered message history, its persistence across runs, a simulated
//! assistant that answers after an artificial delay, and the character-by-
//! character reveal of incoming assistant text. It can drive a terminal,
//! a web view, or run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Surfaces                              │
//! │   ┌──────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │   │   CLI    │  │  Dictation   │  │  Headless / tests     │  │
//! │   └────┬─────┘  └──────┬───────┘  └───────────┬───────────┘  │
//! │        └───────────────┴──────────────────────┘              │
//! │                SurfaceEvent (up) / SurfaceMessage (down)     │
//! └────────────────────────────┼─────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────┐
//! │                      PARLEY CORE                             │
//! │  ┌─────────────────────────┴──────────────────────────────┐  │
//! │  │                 SessionController                      │  │
//! │  │  ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌─────────┐  │  │
//! │  │  │ Session  │ │ Persistent │ │ Response │ │ Reveal  │  │  │
//! │  │  │          │ │   Store    │ │Generator │ │ Engine  │  │  │
//! │  │  └──────────┘ └────────────┘ └──────────┘ └─────────┘  │  │
//! │  │                    Scheduler (timers)                  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`SessionController`]: owns the conversation and coordinates everything
//! - [`SurfaceMessage`]: messages sent from the controller to a renderer
//! - [`SurfaceEvent`]: events sent from a surface to the controller
//! - [`PersistentStore`]: snapshot persistence over a [`KeyValueBackend`]
//! - [`ResponseGenerator`]: the assistant seam, with [`SimulatedResponder`]
//! - [`RevealEngine`]: per-message reveal progress
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use parley_core::{
//!     FileBackend, PersistentStore, SessionConfig, SessionController, SimulatedResponder,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::unbounded_channel();
//!
//!     let store = PersistentStore::new(FileBackend::new("/tmp/parley"), "chatbot-messages");
//!     let responder = Arc::new(SimulatedResponder::from_entropy());
//!     let mut controller = SessionController::new(SessionConfig::default(), responder, store, tx);
//!
//!     controller.send("What's the weather?");
//!
//!     // Apply replies and reveal ticks as they come due
//!     while controller.process_next_event().await {
//!         while let Ok(msg) = rx.try_recv() {
//!             // Render message
//!         }
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`capabilities`]: dictation and theme collaborators
//! - [`config`]: TOML + environment configuration
//! - [`controller`]: the session controller
//! - [`events`]: events from surfaces to the controller
//! - [`messages`]: messages from the controller to surfaces
//! - [`responder`]: response generation
//! - [`reveal`]: incremental text reveal
//! - [`scheduler`]: cancellable scheduled effects
//! - [`session`]: the message sequence
//! - [`store`]: persistence
//! - [`validation`]: input validation
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any terminal or GUI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capabilities;
pub mod config;
pub mod controller;
pub mod events;
pub mod messages;
pub mod responder;
pub mod reveal;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod validation;

// Re-exports for convenience
pub use capabilities::{DictationCapability, ScriptedDictation, StaticTheme, Theme, ThemeCapability};
pub use controller::{
    RenderedMessage, SendOutcome, SessionConfig, SessionController, SessionView,
    DEFAULT_APOLOGY, DEFAULT_CLEARED_GREETING, DEFAULT_GREETING,
};
pub use events::{InputOrigin, SurfaceEvent};
pub use messages::{Author, MessageId, NotifyLevel, SessionState, SurfaceMessage};
pub use responder::{
    DelayWindow, ResponderError, ResponseGenerator, SimulatedResponder, Vocabulary,
};
pub use reveal::{Reveal, RevealEngine, RevealFrame};
pub use scheduler::{ScheduledEvent, Scheduler, TimerKey};
pub use session::{ChatMessage, Session};
pub use store::{
    is_valid_storage_key, FileBackend, KeyValueBackend, MemoryBackend, PersistentStore,
    StoreError, StoredMessage, DEFAULT_STORAGE_KEY,
};
pub use validation::{InputLimits, InputValidator, ValidationResult};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, ParleyConfig, ParleyToml,
};
