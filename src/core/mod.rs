pub mod dictionary;
pub mod engine;
pub mod prefs;
pub mod sanitize;
pub(crate) mod session;
pub mod tts;

// Re-export commonly used types for convenience
pub use dictionary::{DictionaryStore, DictionaryTable};
pub use engine::{ConnectOutcome, SessionOverview, SpeechEngine};
pub use prefs::{PreferenceStore, RATE_RANGE, UserPreference};
pub use sanitize::{MessageKind, Sanitized, sanitize, speakable_text};
pub use tts::{SpeechBackend, SynthesisError, SynthesisGateway, SynthesisResult, VoiceId};
