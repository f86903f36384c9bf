//! Platform boundary types.
//!
//! This module defines the contract between the speech engine and the chat
//! platform it runs against: opaque identifiers, the inbound events the
//! transport layer delivers, and the [`VoiceTransport`] trait the engine
//! drives audio connections through.
//!
//! The engine never talks to a concrete chat platform directly. A frontend
//! adapts its gateway events into [`MessageEvent`] / [`MembershipEvent`]
//! values and implements [`VoiceTransport`] on top of the platform's voice
//! API.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(
    /// Stable identifier of a guild (an independent chat community).
    GuildId
);
id_type!(
    /// Stable identifier of a text or voice channel within a guild.
    ChannelId
);
id_type!(
    /// Stable identifier of a user, valid across guilds.
    UserId
);

// =============================================================================
// Error Types
// =============================================================================

/// Errors surfaced by the transport layer when managing voice connections.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Joining the voice channel failed
    #[error("failed to join voice channel: {0}")]
    ConnectFailed(String),

    /// Moving an existing connection to another channel failed
    #[error("failed to move voice connection: {0}")]
    MoveFailed(String),

    /// Tearing down the connection failed
    #[error("failed to close voice connection: {0}")]
    CloseFailed(String),
}

// =============================================================================
// Inbound Events
// =============================================================================

/// A text message delivered by the transport layer.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub author: UserId,
    /// Messages authored by bots are never read aloud.
    pub author_is_bot: bool,
    pub content: String,
    pub has_attachment: bool,
    pub has_sticker: bool,
}

/// Direction of a voice-channel membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
}

/// A voice-channel join/leave delivered by the transport layer.
#[derive(Debug, Clone)]
pub struct MembershipEvent {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub member: UserId,
    /// Bot membership changes neither announce nor refresh activity.
    pub member_is_bot: bool,
    pub change: MembershipChange,
}

// =============================================================================
// Voice Transport
// =============================================================================

/// Completion callback invoked exactly once per playback attempt, whether the
/// payload finished naturally or was stopped.
pub type PlaybackCallback = Box<dyn FnOnce() + Send + 'static>;

/// Audio-connection operations the engine requires from the platform.
///
/// Connection state is keyed by guild: a transport holds at most one live
/// audio connection per guild, mirroring the engine's one-session-per-guild
/// invariant.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    /// Establish a new audio connection to `channel`.
    async fn connect_to_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<(), ConnectionError>;

    /// Re-route an existing connection to `channel` without tearing it down.
    async fn move_to_channel(
        &self,
        guild: GuildId,
        channel: ChannelId,
    ) -> Result<(), ConnectionError>;

    /// Close the guild's audio connection.
    async fn disconnect_from_channel(&self, guild: GuildId) -> Result<(), ConnectionError>;

    /// Whether the guild currently has a live audio connection.
    fn is_connected(&self, guild: GuildId) -> bool;

    /// Begin playing `audio` on the guild's connection.
    ///
    /// Returns `false` without invoking `on_complete` when the guild has no
    /// live connection; the caller drops the payload. When playback starts,
    /// `on_complete` fires exactly once, on natural end or after
    /// [`stop_playback`](VoiceTransport::stop_playback).
    fn start_playback(&self, guild: GuildId, audio: Bytes, on_complete: PlaybackCallback) -> bool;

    /// Forcibly end the current playback, if any. A no-op when idle.
    fn stop_playback(&self, guild: GuildId);

    /// Number of non-bot members currently present in `channel`.
    fn human_member_count(&self, guild: GuildId, channel: ChannelId) -> usize;

    /// Display name of `member` inside `guild`, for spoken announcements.
    fn member_display_name(&self, guild: GuildId, member: UserId) -> String;

    /// Display name of `channel` inside `guild`, for spoken announcements.
    fn channel_name(&self, guild: GuildId, channel: ChannelId) -> String;
}
