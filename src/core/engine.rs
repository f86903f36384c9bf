//! Speech engine: guild state registry and connection lifecycle supervisor.
//!
//! The engine owns the one cross-guild structure in the system, the session
//! registry. Every create/destroy path (explicit connect and disconnect,
//! guild removal, the idle sweep) goes through a single `tokio` mutex held
//! across the transport call, so two near-simultaneous connects for the same
//! guild can never race into two sessions, and a sweep eviction racing an
//! explicit disconnect resolves to whichever removed the entry first.
//!
//! Per-guild work never runs under that lock: messages and announcements are
//! handed to the session's worker task and the lock is released before any
//! synthesis happens.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::dictionary::{DictionaryStore, DictionaryTable};
use crate::core::prefs::{PreferenceStore, UserPreference};
use crate::core::sanitize::{sanitize, speakable_text};
use crate::core::session::{SessionCommand, SessionStats, spawn_worker};
use crate::core::tts::{SpeechBackend, SynthesisGateway, VoiceId};
use crate::errors::{EngineError, EngineResult};
use crate::platform::{
    ChannelId, GuildId, MembershipChange, MembershipEvent, MessageEvent, UserId, VoiceTransport,
};
use crate::storage::JsonStore;

/// Message body that stops the current utterance instead of being read.
const STOP_KEYWORD: &str = "s";

/// Spoken when a fresh connection is established.
const CONNECTED_ANNOUNCEMENT: &str = "Connected.";

/// How a `connect` call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new session was created.
    Connected,
    /// An existing session was re-routed to another voice channel.
    Moved,
    /// The session already sat on the requested channel; nothing changed.
    AlreadyConnected,
}

/// Read-only view of one session for dashboards and status reports.
#[derive(Debug, Clone)]
pub struct SessionOverview {
    pub guild: GuildId,
    pub voice_channel: ChannelId,
    pub text_source: Option<ChannelId>,
    pub queued: usize,
    pub playing: bool,
    pub idle_secs: u64,
}

/// One guild's registry entry. The queue itself lives inside the worker;
/// the entry carries routing, activity, and the channel into the worker.
struct SessionEntry {
    voice_channel: ChannelId,
    text_source: Option<ChannelId>,
    last_active: Instant,
    tx: mpsc::UnboundedSender<SessionCommand>,
    stats: Arc<SessionStats>,
    worker: JoinHandle<()>,
}

impl SessionEntry {
    fn speak(&self, text: String, user: UserId) {
        let _ = self.tx.send(SessionCommand::Speak { text, user });
    }
}

/// The per-guild speech queue and lifecycle manager.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SpeechEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    transport: Arc<dyn VoiceTransport>,
    synth: Arc<SynthesisGateway>,
    dictionary: DictionaryStore,
    prefs: Arc<PreferenceStore>,
    sessions: Mutex<HashMap<GuildId, SessionEntry>>,
}

impl SpeechEngine {
    /// Build an engine over a transport and a synthesis backend, loading
    /// dictionaries and preferences from the configured data directory.
    pub fn new(
        config: EngineConfig,
        transport: Arc<dyn VoiceTransport>,
        backend: Arc<dyn SpeechBackend>,
    ) -> EngineResult<Self> {
        let store = Arc::new(JsonStore::open(&config.data_dir)?);
        let prefs = Arc::new(PreferenceStore::load(store.clone())?);
        let dictionary = DictionaryStore::load(store)?;
        let synth = Arc::new(SynthesisGateway::new(backend, prefs.clone()));

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                transport,
                synth,
                dictionary,
                prefs,
                sessions: Mutex::new(HashMap::new()),
            }),
        })
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Connect the guild to `voice_channel`, or move an existing session
    /// there.
    ///
    /// `text_source`, when given, designates the text channel whose messages
    /// are read aloud; on a move it replaces the previous designation,
    /// otherwise the old one is preserved. `issuer` is the user whose voice
    /// reads the connect/move announcement.
    pub async fn connect(
        &self,
        guild: GuildId,
        voice_channel: ChannelId,
        text_source: Option<ChannelId>,
        issuer: UserId,
    ) -> EngineResult<ConnectOutcome> {
        let mut sessions = self.inner.sessions.lock().await;

        if let Some(entry) = sessions.get_mut(&guild) {
            if entry.voice_channel == voice_channel {
                return Ok(ConnectOutcome::AlreadyConnected);
            }

            self.inner
                .transport
                .move_to_channel(guild, voice_channel)
                .await?;
            entry.voice_channel = voice_channel;
            if text_source.is_some() {
                entry.text_source = text_source;
            }
            entry.last_active = Instant::now();

            let channel_name = self.inner.transport.channel_name(guild, voice_channel);
            entry.speak(format!("Moved to {channel_name}."), issuer);
            info!(guild = %guild, channel = %voice_channel, "moved voice session");
            return Ok(ConnectOutcome::Moved);
        }

        self.inner
            .transport
            .connect_to_channel(guild, voice_channel)
            .await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(SessionStats::default());
        let worker = spawn_worker(
            guild,
            self.inner.transport.clone(),
            self.inner.synth.clone(),
            tx.clone(),
            rx,
            stats.clone(),
        );

        let entry = SessionEntry {
            voice_channel,
            text_source,
            last_active: Instant::now(),
            tx,
            stats,
            worker,
        };
        entry.speak(CONNECTED_ANNOUNCEMENT.to_string(), issuer);
        sessions.insert(guild, entry);

        info!(guild = %guild, channel = %voice_channel, "voice session created");
        Ok(ConnectOutcome::Connected)
    }

    /// Tear the guild's session down. Unplayed audio is discarded, not
    /// drained.
    pub async fn disconnect(&self, guild: GuildId) -> EngineResult<()> {
        let mut sessions = self.inner.sessions.lock().await;
        let entry = sessions.remove(&guild).ok_or(EngineError::NotConnected)?;
        entry.worker.abort();
        self.inner
            .transport
            .disconnect_from_channel(guild)
            .await?;
        info!(guild = %guild, "voice session closed");
        Ok(())
    }

    /// Designate the text channel whose messages are read aloud.
    pub async fn set_text_source(&self, guild: GuildId, channel: ChannelId) -> EngineResult<()> {
        let mut sessions = self.inner.sessions.lock().await;
        let entry = sessions.get_mut(&guild).ok_or(EngineError::NotConnected)?;
        entry.text_source = Some(channel);
        Ok(())
    }

    /// Stop the utterance currently playing for `guild`. Queued payloads
    /// are kept and the next one starts once the transport reports the
    /// interrupted playback complete.
    pub async fn stop(&self, guild: GuildId) -> EngineResult<()> {
        let sessions = self.inner.sessions.lock().await;
        let entry = sessions.get(&guild).ok_or(EngineError::NotConnected)?;
        let _ = entry.tx.send(SessionCommand::Stop);
        Ok(())
    }

    /// Run `text` through the dictionary tables and queue it for speech in
    /// `user`'s voice. This is the direct producer used by command surfaces;
    /// chat messages arrive through [`handle_message`](Self::handle_message).
    pub async fn speak_text(&self, guild: GuildId, user: UserId, text: &str) -> EngineResult<()> {
        let rendered = self.inner.dictionary.apply(guild, text);
        let sessions = self.inner.sessions.lock().await;
        let entry = sessions.get(&guild).ok_or(EngineError::NotConnected)?;
        entry.speak(rendered, user);
        Ok(())
    }

    // =========================================================================
    // Event Handlers
    // =========================================================================

    /// Feed one inbound chat message through the speech pipeline.
    ///
    /// Silently ignores anything that should not produce speech: bot
    /// authors, guilds without a session, channels other than the designated
    /// text source, and messages that sanitize to nothing. Synthesis
    /// failures downstream are logged and dropped without surfacing here.
    pub async fn handle_message(&self, event: MessageEvent) {
        if event.author_is_bot {
            return;
        }

        let mut sessions = self.inner.sessions.lock().await;
        let Some(entry) = sessions.get_mut(&event.guild) else {
            return;
        };
        if entry.text_source != Some(event.channel) {
            return;
        }

        entry.last_active = Instant::now();

        if event.content.trim() == STOP_KEYWORD {
            let _ = entry.tx.send(SessionCommand::Stop);
            return;
        }

        let sanitized = sanitize(&event.content);
        let Some(text) = speakable_text(
            &sanitized,
            event.has_attachment,
            event.has_sticker,
            self.inner.config.max_utterance_chars,
        ) else {
            return;
        };

        let rendered = self.inner.dictionary.apply(event.guild, &text);
        entry.speak(rendered, event.author);
    }

    /// React to a human joining or leaving a voice channel: refresh the
    /// session's activity clock and announce the change when it happened in
    /// the channel the session is connected to.
    pub async fn handle_membership(&self, event: MembershipEvent) {
        if event.member_is_bot {
            return;
        }

        let mut sessions = self.inner.sessions.lock().await;
        let Some(entry) = sessions.get_mut(&event.guild) else {
            return;
        };
        if entry.voice_channel != event.channel {
            return;
        }

        entry.last_active = Instant::now();

        let name = self
            .inner
            .transport
            .member_display_name(event.guild, event.member);
        let announcement = match event.change {
            MembershipChange::Joined => format!("{name} joined."),
            MembershipChange::Left => format!("{name} left."),
        };
        entry.speak(announcement, event.member);
    }

    /// The guild itself went away: drop its session and its dictionary.
    pub async fn handle_guild_removed(&self, guild: GuildId) {
        match self.disconnect(guild).await {
            Ok(()) => {}
            Err(EngineError::NotConnected) => {}
            Err(e) => warn!(guild = %guild, error = %e, "teardown failed during guild removal"),
        }
        if let Err(e) = self.inner.dictionary.remove_guild(guild) {
            warn!(guild = %guild, error = %e, "failed to delete guild dictionary");
        }
    }

    // =========================================================================
    // Idle Sweep
    // =========================================================================

    /// Scan every session and reclaim the ones nobody is listening to.
    ///
    /// A session with at least one human in its channel gets its activity
    /// clock refreshed, so a listener who drops out and rejoins within the
    /// grace window never loses the connection. A session with no humans is
    /// evicted only once `idle_timeout` has elapsed since the last
    /// activity.
    pub async fn idle_sweep(&self) {
        let mut sessions = self.inner.sessions.lock().await;
        let mut evict = Vec::new();

        for (guild, entry) in sessions.iter_mut() {
            let humans = self
                .inner
                .transport
                .human_member_count(*guild, entry.voice_channel);
            if humans == 0 {
                if entry.last_active.elapsed() > self.inner.config.idle_timeout {
                    evict.push(*guild);
                }
            } else {
                entry.last_active = Instant::now();
            }
        }

        for guild in evict {
            // The entry can be gone already if an explicit disconnect won
            // the race; that is fine.
            let Some(entry) = sessions.remove(&guild) else {
                continue;
            };
            entry.worker.abort();
            if let Err(e) = self.inner.transport.disconnect_from_channel(guild).await {
                warn!(guild = %guild, error = %e, "idle eviction: transport teardown failed");
            }
            info!(guild = %guild, "disconnected idle voice session");
        }
    }

    /// Run [`idle_sweep`](Self::idle_sweep) on the configured cadence until
    /// the returned token is cancelled.
    pub fn spawn_idle_sweeper(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let engine = self.clone();
        let guard = token.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(engine.inner.config.sweep_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so a fresh engine
            // does not sweep before anyone connects.
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = guard.cancelled() => break,
                    _ = tick.tick() => engine.idle_sweep().await,
                }
            }
            debug!("idle sweeper stopped");
        });
        token
    }

    // =========================================================================
    // Preferences & Dictionaries
    // =========================================================================

    /// Set a user's speech rate, in percent. Valid range -50..=200.
    pub fn set_rate(&self, user: UserId, rate_percent: i32) -> EngineResult<()> {
        self.inner.prefs.set_rate(user, rate_percent)
    }

    /// Set a user's voice.
    pub fn set_voice(&self, user: UserId, voice: VoiceId) -> EngineResult<()> {
        self.inner.prefs.set_voice(user, voice)
    }

    /// A user's current preference record.
    pub fn preference(&self, user: UserId) -> UserPreference {
        self.inner.prefs.get(user)
    }

    /// Add or update a rule in a guild's dictionary.
    pub fn add_word(&self, guild: GuildId, source: &str, replacement: &str) -> EngineResult<()> {
        Ok(self.inner.dictionary.add_word(guild, source, replacement)?)
    }

    /// Remove a rule from a guild's dictionary. Returns whether it existed.
    pub fn remove_word(&self, guild: GuildId, source: &str) -> EngineResult<bool> {
        Ok(self.inner.dictionary.remove_word(guild, source)?)
    }

    /// A guild's dictionary, in display order.
    pub fn words(&self, guild: GuildId) -> DictionaryTable {
        self.inner.dictionary.words(guild)
    }

    /// Add or update a rule in the global dictionary.
    pub fn add_global_word(&self, source: &str, replacement: &str) -> EngineResult<()> {
        Ok(self.inner.dictionary.add_global_word(source, replacement)?)
    }

    /// Remove a rule from the global dictionary. Returns whether it existed.
    pub fn remove_global_word(&self, source: &str) -> EngineResult<bool> {
        Ok(self.inner.dictionary.remove_global_word(source)?)
    }

    /// The global dictionary, in display order.
    pub fn global_words(&self) -> DictionaryTable {
        self.inner.dictionary.global_words()
    }

    // =========================================================================
    // Read-only Accessors
    // =========================================================================

    /// Whether the guild currently has a session.
    pub async fn is_connected(&self, guild: GuildId) -> bool {
        self.inner.sessions.lock().await.contains_key(&guild)
    }

    /// Number of active sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }

    /// Payloads waiting behind the in-flight one for `guild`.
    pub async fn queue_len(&self, guild: GuildId) -> EngineResult<usize> {
        let sessions = self.inner.sessions.lock().await;
        let entry = sessions.get(&guild).ok_or(EngineError::NotConnected)?;
        Ok(entry.stats.queued.load(Ordering::Acquire))
    }

    /// Whether a payload is currently in flight for `guild`.
    pub async fn is_playing(&self, guild: GuildId) -> EngineResult<bool> {
        let sessions = self.inner.sessions.lock().await;
        let entry = sessions.get(&guild).ok_or(EngineError::NotConnected)?;
        Ok(entry.stats.playing.load(Ordering::Acquire))
    }

    /// Snapshot of every session, for dashboards.
    pub async fn session_overview(&self) -> Vec<SessionOverview> {
        let sessions = self.inner.sessions.lock().await;
        sessions
            .iter()
            .map(|(guild, entry)| SessionOverview {
                guild: *guild,
                voice_channel: entry.voice_channel,
                text_source: entry.text_source,
                queued: entry.stats.queued.load(Ordering::Acquire),
                playing: entry.stats.playing.load(Ordering::Acquire),
                idle_secs: entry.last_active.elapsed().as_secs(),
            })
            .collect()
    }
}
