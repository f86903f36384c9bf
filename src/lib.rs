//! Per-guild text-to-speech queueing and voice-session lifecycle engine.
//!
//! This crate turns chat messages into ordered spoken audio for any number
//! of independent guilds at once. Each guild gets its own strictly
//! sequential speech pipeline (sanitize → dictionary substitution →
//! synthesis → playback) while guilds run fully concurrently, and an idle
//! sweep reclaims connections nobody is listening to.
//!
//! The chat platform itself is abstract: embed the engine by implementing
//! [`platform::VoiceTransport`] over your platform's voice API and
//! [`core::tts::SpeechBackend`] over your synthesis service, then feed
//! gateway events into [`SpeechEngine`].

pub mod config;
pub mod core;
pub mod errors;
pub mod platform;
pub mod storage;

// Re-export commonly used items for convenience
pub use config::{ConfigError, EngineConfig};
pub use core::engine::{ConnectOutcome, SessionOverview, SpeechEngine};
pub use core::sanitize::{MessageKind, Sanitized};
pub use core::tts::{SpeechBackend, SynthesisError, SynthesisResult, VoiceId};
pub use errors::{EngineError, EngineResult};
pub use platform::{
    ChannelId, ConnectionError, GuildId, MembershipChange, MembershipEvent, MessageEvent,
    PlaybackCallback, UserId, VoiceTransport,
};
pub use storage::{JsonStore, StoreError, StoreResult};
