//! In-memory platform doubles for engine tests.
//!
//! `MockVoiceTransport` models the platform voice API: connections are a
//! map, playback is a held completion callback the test fires explicitly,
//! and starting a second payload while one is in flight panics so any
//! overlap bug fails loudly. `MockSpeechBackend` echoes the request text
//! back as the audio payload, which lets assertions read what "played".

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use readaloud_gateway::core::tts::{SpeechBackend, SynthesisError, SynthesisResult};
use readaloud_gateway::platform::{
    ChannelId, ConnectionError, GuildId, PlaybackCallback, UserId, VoiceTransport,
};

#[derive(Default)]
pub struct MockVoiceTransport {
    connections: Mutex<HashMap<GuildId, ChannelId>>,
    humans: Mutex<HashMap<ChannelId, usize>>,
    in_flight: Mutex<HashMap<GuildId, (String, PlaybackCallback)>>,
    played: Mutex<Vec<(GuildId, String)>>,
    fail_connect: AtomicBool,
}

impl MockVoiceTransport {
    /// Text of the payload currently in flight for `guild`, if any.
    pub fn current(&self, guild: GuildId) -> Option<String> {
        self.in_flight.lock().get(&guild).map(|(text, _)| text.clone())
    }

    /// Fire the completion callback for `guild`'s in-flight payload.
    pub fn finish(&self, guild: GuildId) -> bool {
        // Take the callback out before invoking it so the lock is not held
        // across whatever the engine does in response.
        let entry = self.in_flight.lock().remove(&guild);
        match entry {
            Some((_, on_complete)) => {
                on_complete();
                true
            }
            None => false,
        }
    }

    /// Everything that ever started playing, in start order.
    pub fn played(&self) -> Vec<(GuildId, String)> {
        self.played.lock().clone()
    }

    pub fn set_humans(&self, channel: ChannelId, count: usize) {
        self.humans.lock().insert(channel, count);
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::Release);
    }

    /// Drop the connection out from under the engine, as a platform outage
    /// would.
    pub fn sever(&self, guild: GuildId) {
        self.connections.lock().remove(&guild);
        self.in_flight.lock().remove(&guild);
    }
}

#[async_trait]
impl VoiceTransport for MockVoiceTransport {
    async fn connect_to_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<(), ConnectionError> {
        if self.fail_connect.load(Ordering::Acquire) {
            return Err(ConnectionError::ConnectFailed("mock refusal".to_string()));
        }
        self.connections.lock().insert(guild, channel);
        Ok(())
    }

    async fn move_to_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<(), ConnectionError> {
        match self.connections.lock().get_mut(&guild) {
            Some(current) => {
                *current = channel;
                Ok(())
            }
            None => Err(ConnectionError::MoveFailed("not connected".to_string())),
        }
    }

    async fn disconnect_from_channel(&self, guild: GuildId) -> Result<(), ConnectionError> {
        self.connections.lock().remove(&guild);
        self.in_flight.lock().remove(&guild);
        Ok(())
    }

    fn is_connected(&self, guild: GuildId) -> bool {
        self.connections.lock().contains_key(&guild)
    }

    fn start_playback(&self, guild: GuildId, audio: Bytes, on_complete: PlaybackCallback) -> bool {
        if !self.is_connected(guild) {
            return false;
        }
        let text = String::from_utf8_lossy(&audio).into_owned();
        self.played.lock().push((guild, text.clone()));
        let previous = self.in_flight.lock().insert(guild, (text, on_complete));
        assert!(
            previous.is_none(),
            "second payload started while one was in flight for guild {guild}"
        );
        true
    }

    fn stop_playback(&self, guild: GuildId) {
        // The platform fires the completion callback after an interrupt,
        // same as it does on natural end.
        self.finish(guild);
    }

    fn human_member_count(&self, _guild: GuildId, channel: ChannelId) -> usize {
        self.humans.lock().get(&channel).copied().unwrap_or(0)
    }

    fn member_display_name(&self, _guild: GuildId, member: UserId) -> String {
        format!("user-{member}")
    }

    fn channel_name(&self, _guild: GuildId, channel: ChannelId) -> String {
        format!("channel-{channel}")
    }
}

#[derive(Default)]
pub struct MockSpeechBackend {
    requests: Mutex<Vec<SynthesisRequest>>,
    fail: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub rate: Option<String>,
}

impl MockSpeechBackend {
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }
}

#[async_trait]
impl SpeechBackend for MockSpeechBackend {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        rate: Option<&str>,
    ) -> SynthesisResult<Bytes> {
        if self.fail.load(Ordering::Acquire) {
            return Err(SynthesisError::Rejected("mock failure".to_string()));
        }
        self.requests.lock().push(SynthesisRequest {
            text: text.to_string(),
            voice: voice.to_string(),
            rate: rate.map(str::to_string),
        });
        Ok(Bytes::from(text.to_string().into_bytes()))
    }
}
