//! Engine configuration.
//!
//! Configuration is read from environment variables with validated defaults;
//! every knob can also be set directly on [`EngineConfig`] by an embedding
//! application. Priority: explicit struct fields > environment variables >
//! defaults.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `READALOUD_DATA_DIR` | `./data` | Root directory for dictionaries and preferences |
//! | `READALOUD_IDLE_TIMEOUT_SECS` | `60` | Seconds without human listeners before eviction |
//! | `READALOUD_SWEEP_INTERVAL_SECS` | `60` | Cadence of the idle sweep |
//! | `READALOUD_MAX_UTTERANCE_CHARS` | `300` | Spoken-text length before truncation |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default root for persisted dictionaries and preferences.
const DEFAULT_DATA_DIR: &str = "./data";

/// Default idle threshold before an unattended session is reclaimed.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;

/// Default idle-sweep cadence. A tunable, not a correctness requirement.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default cap on spoken text length, in characters.
const DEFAULT_MAX_UTTERANCE_CHARS: usize = 300;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that does not parse
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },

    /// A validated field was out of range
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for the JSON store.
    pub data_dir: PathBuf,

    /// How long a session may sit without human listeners before the idle
    /// sweep reclaims it.
    pub idle_timeout: Duration,

    /// How often the idle sweep runs.
    pub sweep_interval: Duration,

    /// Maximum spoken-text length; longer messages are truncated with a
    /// spoken marker.
    pub max_utterance_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            max_utterance_chars: DEFAULT_MAX_UTTERANCE_CHARS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            data_dir: env::var("READALOUD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            idle_timeout: Duration::from_secs(parse_env(
                "READALOUD_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )?),
            sweep_interval: Duration::from_secs(parse_env(
                "READALOUD_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?),
            max_utterance_chars: parse_env(
                "READALOUD_MAX_UTTERANCE_CHARS",
                DEFAULT_MAX_UTTERANCE_CHARS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "idle_timeout must be greater than zero".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Validation(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        if self.max_utterance_chars == 0 {
            return Err(ConfigError::Validation(
                "max_utterance_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}
