//! Response Generator Traits
//!
//! Trait definitions for whatever produces assistant replies. The controller
//! only sees this interface, so the local simulator can later be swapped for
//! a real backend without touching session logic.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a response generator can report
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResponderError {
    /// Simulated transient failure
    #[error("Simulated backend failure")]
    Simulated,
}

/// Response generator trait
///
/// Implementations must not block the caller; any latency is awaited inside
/// `generate`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Get the generator name (e.g., "simulated")
    fn name(&self) -> &str;

    /// Produce the assistant reply to `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, ResponderError>;
}
