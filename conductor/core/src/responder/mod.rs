//! Response Generation
//!
//! This module provides the assistant side of the conversation behind a
//! common trait interface.
//!
//! # Available Generators
//!
//! - **Simulated**: local fixed-vocabulary simulator with artificial latency
//!
//! # Usage
//!
//! ```ignore
//! use parley_core::responder::{ResponseGenerator, SimulatedResponder};
//!
//! let responder = SimulatedResponder::seeded(7);
//! let reply = responder.generate("What's the weather?").await?;
//! ```

mod phrases;
mod simulated;
mod traits;

pub use phrases::{OPENINGS, TOPICS};
pub use simulated::{DelayWindow, SimulatedResponder, Vocabulary};
pub use traits::{ResponderError, ResponseGenerator};
