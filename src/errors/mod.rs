//! Engine-level error taxonomy.
//!
//! Component errors ([`SynthesisError`], [`ConnectionError`], [`StoreError`])
//! stay typed all the way up so callers can tell a dropped utterance from a
//! failed command. Per-utterance failures never abort a guild's worker, and
//! no error propagates across guild boundaries.

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::tts::SynthesisError;
use crate::platform::ConnectionError;
use crate::storage::StoreError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The synthesis backend failed for one utterance
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The voice connection could not be established or torn down
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A dictionary or preference write could not be persisted
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration was invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation requires an active voice session and there is none
    #[error("not connected to a voice channel in this guild")]
    NotConnected,

    /// A speech rate outside the allowed -50..=200 range
    #[error("speech rate {0}% is outside the allowed range (-50 to +200)")]
    InvalidRate(i32),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
