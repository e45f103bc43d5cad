//! TOML Configuration File Support
//!
//! Centralized configuration loading, from a TOML file at
//! `~/.config/parley/parley.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/parley/parley.toml` for configuration
//! - `$XDG_DATA_HOME/parley/` for the session snapshot
//!
//! # Example Configuration
//!
//! ```toml
//! [session]
//! clear_greeting_delay_ms = 500
//! storage_key = "chatbot-messages"
//! max_message_bytes = 102400
//!
//! [responder]
//! min_delay_ms = 1000
//! max_delay_ms = 3000
//! failure_rate = 0.05
//! seed = 42
//!
//! [reveal]
//! tick_ms = 30
//! reveal_restored = false
//!
//! [storage]
//! data_dir = "/var/lib/parley"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{
    SessionConfig, DEFAULT_APOLOGY, DEFAULT_CLEARED_GREETING, DEFAULT_CLEAR_GREETING_DELAY,
    DEFAULT_GREETING,
};
use crate::responder::DelayWindow;
use crate::reveal::DEFAULT_TICK;
use crate::store::{default_data_dir, is_valid_storage_key, DEFAULT_STORAGE_KEY};
use crate::validation::{InputLimits, DEFAULT_MAX_MESSAGE_BYTES};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Greeting for an empty session
    pub greeting: Option<String>,

    /// Greeting inserted after a clear
    pub cleared_greeting: Option<String>,

    /// Reply substituted on generator failure
    pub apology: Option<String>,

    /// Delay before the post-clear greeting in milliseconds
    pub clear_greeting_delay_ms: Option<u64>,

    /// Key the snapshot is stored under
    pub storage_key: Option<String>,

    /// Maximum message size in bytes
    pub max_message_bytes: Option<usize>,
}

/// Responder section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderToml {
    /// Lower bound of the simulated latency
    pub min_delay_ms: Option<u64>,

    /// Upper bound of the simulated latency
    pub max_delay_ms: Option<u64>,

    /// Probability that a reply fails
    pub failure_rate: Option<f64>,

    /// Fixed RNG seed for reproducible sessions
    pub seed: Option<u64>,
}

/// Reveal section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealToml {
    /// Interval between reveal steps in milliseconds
    pub tick_ms: Option<u64>,

    /// Whether restored messages are revealed again
    pub reveal_restored: Option<bool>,
}

/// Storage section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageToml {
    /// Directory holding the snapshot
    pub data_dir: Option<PathBuf>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyToml {
    /// Session configuration section
    pub session: SessionToml,

    /// Responder configuration section
    pub responder: ResponderToml,

    /// Reveal configuration section
    pub reveal: RevealToml,

    /// Storage configuration section
    pub storage: StorageToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ParleyConfig {
    /// Greeting for an empty session
    pub greeting: String,

    /// Greeting inserted after a clear
    pub cleared_greeting: String,

    /// Reply substituted on generator failure
    pub apology: String,

    /// Delay before the post-clear greeting
    pub clear_greeting_delay: Duration,

    /// Key the snapshot is stored under
    pub storage_key: String,

    /// Maximum message size in bytes
    pub max_message_bytes: usize,

    /// Lower bound of the simulated latency
    pub min_delay: Duration,

    /// Upper bound of the simulated latency
    pub max_delay: Duration,

    /// Probability that a reply fails
    pub failure_rate: f64,

    /// Fixed RNG seed
    pub seed: Option<u64>,

    /// Interval between reveal steps
    pub reveal_tick: Duration,

    /// Whether restored messages are revealed again
    pub reveal_restored: bool,

    /// Explicit data directory (default is the XDG data dir)
    pub data_dir: Option<PathBuf>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        let delay = DelayWindow::default();
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            cleared_greeting: DEFAULT_CLEARED_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            clear_greeting_delay: DEFAULT_CLEAR_GREETING_DELAY,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            min_delay: delay.min(),
            max_delay: delay.max(),
            failure_rate: 0.0,
            seed: None,
            reveal_tick: DEFAULT_TICK,
            reveal_restored: false,
            data_dir: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ParleyConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_delay > self.max_delay {
            return Err(ConfigError::ValidationError(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                self.min_delay.as_millis(),
                self.max_delay.as_millis()
            )));
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::ValidationError(format!(
                "failure_rate must be within [0, 1], got {}",
                self.failure_rate
            )));
        }
        if self.reveal_tick.is_zero() {
            return Err(ConfigError::ValidationError(
                "reveal tick_ms must be greater than zero".to_string(),
            ));
        }
        if !is_valid_storage_key(&self.storage_key) {
            return Err(ConfigError::ValidationError(format!(
                "storage_key {:?} must be non-empty, use only [A-Za-z0-9._-] and not start with '.'",
                self.storage_key
            )));
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Controller settings
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            greeting: self.greeting.clone(),
            cleared_greeting: self.cleared_greeting.clone(),
            apology: self.apology.clone(),
            clear_greeting_delay: self.clear_greeting_delay,
            reveal_tick: self.reveal_tick,
            reveal_restored: self.reveal_restored,
            limits: InputLimits {
                max_message_bytes: self.max_message_bytes,
            },
        }
    }

    /// Simulated latency window
    #[must_use]
    pub fn delay_window(&self) -> DelayWindow {
        DelayWindow::new(self.min_delay, self.max_delay)
    }

    /// Directory the snapshot lives in
    #[must_use]
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(default_data_dir)
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/parley/parley.toml` or
/// `~/.config/parley/parley.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("parley").join("parley.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the merged values are out of range. A missing config file is not an
/// error (defaults are used).
pub fn load_config() -> Result<ParleyConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// If `path` is `None`, only defaults and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ParleyConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration reading environment values through `env`
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ParleyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Start with defaults
    let mut config = ParleyConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ParleyToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Environment overrides file values
    apply_env_config(&mut config, env);

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ParleyConfig, toml: &ParleyToml) {
    // Session settings
    if let Some(ref greeting) = toml.session.greeting {
        config.greeting = greeting.clone();
    }
    if let Some(ref greeting) = toml.session.cleared_greeting {
        config.cleared_greeting = greeting.clone();
    }
    if let Some(ref apology) = toml.session.apology {
        config.apology = apology.clone();
    }
    if let Some(ms) = toml.session.clear_greeting_delay_ms {
        config.clear_greeting_delay = Duration::from_millis(ms);
    }
    if let Some(ref key) = toml.session.storage_key {
        config.storage_key = key.clone();
    }
    if let Some(bytes) = toml.session.max_message_bytes {
        config.max_message_bytes = bytes;
    }

    // Responder settings
    if let Some(ms) = toml.responder.min_delay_ms {
        config.min_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.responder.max_delay_ms {
        config.max_delay = Duration::from_millis(ms);
    }
    if let Some(rate) = toml.responder.failure_rate {
        config.failure_rate = rate;
    }
    if toml.responder.seed.is_some() {
        config.seed = toml.responder.seed;
    }

    // Reveal settings
    if let Some(ms) = toml.reveal.tick_ms {
        config.reveal_tick = Duration::from_millis(ms);
    }
    if let Some(restored) = toml.reveal.reveal_restored {
        config.reveal_restored = restored;
    }

    // Storage settings
    if toml.storage.data_dir.is_some() {
        config.data_dir = toml.storage.data_dir.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut ParleyConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = env("PARLEY_STORAGE_KEY") {
        config.storage_key = key;
        config.source = ConfigSource::Env;
    }

    if let Some(dir) = env("PARLEY_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(dir));
        config.source = ConfigSource::Env;
    }

    if let Some(ms) = env("PARLEY_MIN_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.min_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }

    if let Some(ms) = env("PARLEY_MAX_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.max_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }

    if let Some(rate) = env("PARLEY_FAILURE_RATE").and_then(|v| v.parse::<f64>().ok()) {
        config.failure_rate = rate;
        config.source = ConfigSource::Env;
    }

    if let Some(seed) = env("PARLEY_SEED").and_then(|v| v.parse::<u64>().ok()) {
        config.seed = Some(seed);
        config.source = ConfigSource::Env;
    }

    if let Some(ms) = env("PARLEY_REVEAL_TICK_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.reveal_tick = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }

    if let Some(ms) = env("PARLEY_CLEAR_GREETING_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.clear_greeting_delay = Duration::from_millis(ms);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Data directory override
    pub data_dir: Option<PathBuf>,
    /// RNG seed override
    pub seed: Option<u64>,
    /// Failure rate override
    pub failure_rate: Option<f64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set data directory override
    #[must_use]
    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        self.data_dir = Some(dir);
        self
    }

    /// Set seed override
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set failure rate override
    #[must_use]
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = Some(rate);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an override puts a value out of range.
    pub fn apply(&self, config: &mut ParleyConfig) -> Result<(), ConfigError> {
        if self.data_dir.is_some() || self.seed.is_some() || self.failure_rate.is_some() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref dir) = self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(rate) = self.failure_rate {
            config.failure_rate = rate;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = ParleyConfig::default();
        assert_eq!(config.storage_key, "chatbot-messages");
        assert_eq!(config.clear_greeting_delay, Duration::from_millis(500));
        assert_eq!(config.min_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_millis(3000));
        assert_eq!(config.reveal_tick, Duration::from_millis(30));
        assert_eq!(config.max_message_bytes, 102400);
        assert!(!config.reveal_restored);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("parley/parley.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
[session]
cleared_greeting = "Fresh start!"
clear_greeting_delay_ms = 250
storage_key = "test-messages"

[responder]
min_delay_ms = 10
max_delay_ms = 20
failure_rate = 0.25
seed = 7

[reveal]
tick_ms = 5
reveal_restored = true

[storage]
data_dir = "/tmp/parley-test"
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.cleared_greeting, "Fresh start!");
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.clear_greeting_delay, Duration::from_millis(250));
        assert_eq!(config.storage_key, "test-messages");
        assert_eq!(config.delay_window(), DelayWindow::from_millis(10, 20));
        assert_eq!(config.failure_rate, 0.25);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.reveal_tick, Duration::from_millis(5));
        assert!(config.reveal_restored);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/parley-test")));
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_parse_empty_toml() {
        let file = write_toml("");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_missing_file_graceful() {
        let path = PathBuf::from("/nonexistent/path/parley.toml");
        let config = load_config_with_env(Some(path), no_env).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml("[responder\nmin_delay_ms = \"soon\"\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    // =========================================================================
    // Environment Override Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let file = write_toml("[responder]\nseed = 1\n");
        let env: HashMap<&str, &str> = [
            ("PARLEY_SEED", "99"),
            ("PARLEY_STORAGE_KEY", "env-key"),
            ("PARLEY_REVEAL_TICK_MS", "12"),
            ("PARLEY_MIN_DELAY_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = load_config_with_env(Some(file.path().to_path_buf()), |k| {
            env.get(k).map(ToString::to_string)
        })
        .unwrap();

        assert_eq!(config.seed, Some(99));
        assert_eq!(config.storage_key, "env-key");
        assert_eq!(config.reveal_tick, Duration::from_millis(12));
        // Unparsable values are ignored
        assert_eq!(config.min_delay, Duration::from_millis(1000));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    // =========================================================================
    // Validation Tests
    // =========================================================================

    #[test]
    fn test_inverted_delay_rejected() {
        let file = write_toml("[responder]\nmin_delay_ms = 500\nmax_delay_ms = 100\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_failure_rate_out_of_range_rejected() {
        let mut config = ParleyConfig::default();
        config.failure_rate = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unusable_storage_key_rejected() {
        for key in ["chat messages", ".hidden", "a/b", ""] {
            let mut config = ParleyConfig::default();
            config.storage_key = key.to_string();
            assert!(
                matches!(config.validate(), Err(ConfigError::ValidationError(_))),
                "storage_key {key:?} should be rejected"
            );
        }

        let file = write_toml("[session]\nstorage_key = \"chat messages\"\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let file = write_toml("[reveal]\ntick_ms = 0\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    // =========================================================================
    // CLI Override Tests
    // =========================================================================

    #[test]
    fn test_cli_overrides() {
        let mut config = ParleyConfig::default();
        ConfigOverrides::new()
            .with_seed(3)
            .with_failure_rate(0.5)
            .with_data_dir(PathBuf::from("/tmp/override"))
            .apply(&mut config)
            .unwrap();

        assert_eq!(config.seed, Some(3));
        assert_eq!(config.failure_rate, 0.5);
        assert_eq!(config.resolved_data_dir(), Some(PathBuf::from("/tmp/override")));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_cli_override_validated() {
        let mut config = ParleyConfig::default();
        let result = ConfigOverrides::new()
            .with_failure_rate(-0.1)
            .apply(&mut config);
        assert!(result.is_err());
    }

    #[test]
    fn test_session_config_carries_values() {
        let mut config = ParleyConfig::default();
        config.max_message_bytes = 64;
        config.reveal_restored = true;

        let session = config.session_config();
        assert_eq!(session.limits.max_message_bytes, 64);
        assert!(session.reveal_restored);
        assert_eq!(session.apology, DEFAULT_APOLOGY);
    }
}
