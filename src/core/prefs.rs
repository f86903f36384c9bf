//! Per-user speech preferences.
//!
//! Preferences are keyed by user id alone, not by guild, so a user sounds
//! the same everywhere. Records are created lazily on the first write and
//! persisted as one JSON document; there is no deletion path.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::tts::VoiceId;
use crate::errors::{EngineError, EngineResult};
use crate::platform::UserId;
use crate::storage::{JsonStore, StoreResult};

/// Store key of the preference document.
const PREFS_KEY: &str = "user_prefs";

/// Allowed speech-rate range, in percent relative to the backend default.
pub const RATE_RANGE: std::ops::RangeInclusive<i32> = -50..=200;

/// One user's speech settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPreference {
    /// Rate adjustment in percent; `0` means the backend default and is
    /// never sent as an explicit modifier.
    #[serde(default)]
    pub rate_percent: i32,

    /// Which synthesized voice reads this user's messages.
    #[serde(default)]
    pub voice: VoiceId,
}

/// In-memory preference table with write-through persistence.
pub struct PreferenceStore {
    table: RwLock<HashMap<UserId, UserPreference>>,
    store: Arc<JsonStore>,
}

impl PreferenceStore {
    /// Load all preferences from the store.
    pub fn load(store: Arc<JsonStore>) -> StoreResult<Self> {
        let table = store.load(PREFS_KEY)?;
        Ok(Self {
            table: RwLock::new(table),
            store,
        })
    }

    /// The user's preference, or the defaults when none was ever written.
    pub fn get(&self, user: UserId) -> UserPreference {
        self.table.read().get(&user).copied().unwrap_or_default()
    }

    /// Set the user's speech rate. Rejects values outside -50..=200 before
    /// touching memory or disk.
    pub fn set_rate(&self, user: UserId, rate_percent: i32) -> EngineResult<()> {
        if !RATE_RANGE.contains(&rate_percent) {
            return Err(EngineError::InvalidRate(rate_percent));
        }
        self.update(user, |pref| pref.rate_percent = rate_percent)
    }

    /// Set the user's voice.
    pub fn set_voice(&self, user: UserId, voice: VoiceId) -> EngineResult<()> {
        self.update(user, |pref| pref.voice = voice)
    }

    fn update(&self, user: UserId, apply: impl FnOnce(&mut UserPreference)) -> EngineResult<()> {
        let mut table = self.table.write();
        let mut updated = table.clone();
        apply(updated.entry(user).or_default());
        self.store.save(PREFS_KEY, &updated)?;
        *table = updated;
        Ok(())
    }
}
