//! Base trait and types for speech-synthesis backends.
//!
//! The engine treats synthesis as an external collaborator: text plus a
//! voice id and an optional rate modifier go in, encoded audio bytes come
//! out. Anything that can satisfy that contract (a cloud TTS API, a local
//! neural model, a test double) plugs in behind [`SpeechBackend`].

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by a synthesis backend.
///
/// A synthesis failure is terminal for that one utterance only; callers log
/// it and drop the request.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The backend could not be reached
    #[error("synthesis backend unreachable: {0}")]
    BackendUnavailable(String),

    /// The backend rejected the request (bad voice id, quota, payload)
    #[error("synthesis request rejected: {0}")]
    Rejected(String),

    /// The backend returned an unusable response
    #[error("synthesis response invalid: {0}")]
    InvalidResponse(String),
}

/// Result type for synthesis operations.
pub type SynthesisResult<T> = Result<T, SynthesisError>;

// =============================================================================
// Voices
// =============================================================================

/// The closed set of voices users may pick from.
///
/// Each variant maps to a neural voice id understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoiceId {
    /// Female Japanese voice; the default.
    #[default]
    Nanami,
    /// Male Japanese voice.
    Keita,
}

impl VoiceId {
    /// The backend voice identifier for this variant.
    pub fn backend_id(&self) -> &'static str {
        match self {
            VoiceId::Nanami => "ja-JP-NanamiNeural",
            VoiceId::Keita => "ja-JP-KeitaNeural",
        }
    }

    /// Parse a user-facing voice name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "nanami" => Some(VoiceId::Nanami),
            "keita" => Some(VoiceId::Keita),
            _ => None,
        }
    }

    /// All selectable voices, for command surfaces to enumerate.
    pub fn all() -> &'static [VoiceId] {
        &[VoiceId::Nanami, VoiceId::Keita]
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// A speech-synthesis backend.
///
/// `rate` is a preformatted signed percentage such as `"+25%"` or `"-10%"`,
/// or `None` to use the backend's default pacing. Callers never pass an
/// explicit zero modifier.
#[async_trait]
pub trait SpeechBackend: Send + Sync + 'static {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        rate: Option<&str>,
    ) -> SynthesisResult<Bytes>;
}

/// Format a rate percentage for the backend, omitting the modifier entirely
/// at zero so the backend default applies.
pub fn format_rate(rate_percent: i32) -> Option<String> {
    if rate_percent == 0 {
        None
    } else {
        Some(format!("{rate_percent:+}%"))
    }
}
