//! Input Validation
//!
//! User input is checked at the boundary, before it can touch the session.
//!
//! Message text is otherwise arbitrary: control characters and escape
//! sequences are kept as typed, and it is up to each renderer to display
//! them safely. Blank input is not an error the user needs to hear about, so
//! it is reported separately from input that was refused.

/// Default maximum size of a single message in bytes (100KB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 100 * 1024;

/// Limits applied to user input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputLimits {
    /// Maximum size of a single message after trimming
    pub max_message_bytes: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

/// Result of input validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    /// Input is valid; carries the trimmed text
    Valid(String),
    /// Nothing but whitespace
    Blank,
    /// Input is invalid with reason
    Invalid(String),
}

/// Validator for user messages
#[derive(Clone, Debug, Default)]
pub struct InputValidator {
    limits: InputLimits,
}

impl InputValidator {
    /// Create a new input validator with the given limits
    pub fn new(limits: InputLimits) -> Self {
        Self { limits }
    }

    /// Limits in force
    pub fn limits(&self) -> &InputLimits {
        &self.limits
    }

    /// Validate a user message
    pub fn validate_message(&self, content: &str) -> ValidationResult {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return ValidationResult::Blank;
        }

        if trimmed.len() > self.limits.max_message_bytes {
            return ValidationResult::Invalid(format!(
                "Message too large: {} bytes (max: {})",
                trimmed.len(),
                self.limits.max_message_bytes
            ));
        }

        ValidationResult::Valid(trimmed.to_string())
    }
}
