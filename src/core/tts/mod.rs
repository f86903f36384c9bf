mod base;
mod gateway;

pub use base::{SpeechBackend, SynthesisError, SynthesisResult, VoiceId, format_rate};
pub use gateway::SynthesisGateway;
