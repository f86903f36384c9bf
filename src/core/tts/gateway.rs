//! Synthesis gateway.
//!
//! Sits between the speech pipeline and the backend: resolves the speaking
//! user's voice and rate preferences, formats the rate modifier, and
//! delegates. No retry logic lives here; a backend failure surfaces as a
//! [`SynthesisError`] and the caller decides what to drop.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::core::prefs::PreferenceStore;
use crate::core::tts::base::{SpeechBackend, SynthesisResult, format_rate};
use crate::platform::UserId;

/// Preference-aware front door to the synthesis backend.
pub struct SynthesisGateway {
    backend: Arc<dyn SpeechBackend>,
    prefs: Arc<PreferenceStore>,
}

impl SynthesisGateway {
    pub fn new(backend: Arc<dyn SpeechBackend>, prefs: Arc<PreferenceStore>) -> Self {
        Self { backend, prefs }
    }

    /// Synthesize `text` with `user`'s voice and rate settings.
    pub async fn synthesize(&self, text: &str, user: UserId) -> SynthesisResult<Bytes> {
        let pref = self.prefs.get(user);
        let rate = format_rate(pref.rate_percent);
        debug!(
            user = %user,
            voice = pref.voice.backend_id(),
            rate = rate.as_deref().unwrap_or("default"),
            chars = text.chars().count(),
            "requesting synthesis"
        );
        self.backend
            .synthesize(text, pref.voice.backend_id(), rate.as_deref())
            .await
    }
}
