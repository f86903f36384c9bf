//! Per-guild speech worker and playback queue.
//!
//! Each active session owns exactly one worker task. The worker serializes
//! everything for its guild: synthesis requests run one at a time in arrival
//! order, finished audio lands on the playback queue, and the queue drives
//! the platform connection so at most one payload is ever in flight.
//! Workers for different guilds never share state, so a slow backend call
//! for one guild cannot stall another.
//!
//! The queue is an explicit two-state machine (`Idle`/`Playing`) advanced by
//! a completion callback from the transport, not by re-entrant playback
//! calls, which keeps failure handling and stack depth bounded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::tts::SynthesisGateway;
use crate::platform::{GuildId, UserId, VoiceTransport};

/// Work items accepted by a session worker.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Synthesize `text` with `user`'s preferences and queue the audio.
    Speak { text: String, user: UserId },
    /// The transport finished (or was told to abandon) the current payload.
    PlaybackDone,
    /// Forcibly end the current payload. The queue advances when the
    /// transport's completion callback comes back around.
    Stop,
}

/// Live counters shared between a worker and the engine's read-only
/// accessors.
#[derive(Debug, Default)]
pub(crate) struct SessionStats {
    /// Payloads waiting behind the in-flight one.
    pub queued: AtomicUsize,
    /// Whether a payload is currently in flight.
    pub playing: AtomicBool,
}

/// FIFO of pending audio plus the single in-flight slot.
#[derive(Debug, Default)]
pub(crate) struct PlaybackQueue {
    pending: VecDeque<Bytes>,
    playing: bool,
}

impl PlaybackQueue {
    /// Append a payload. Returns the payload to start now if the queue was
    /// idle, `None` if something is already in flight.
    pub fn enqueue(&mut self, audio: Bytes) -> Option<Bytes> {
        self.pending.push_back(audio);
        if self.playing {
            None
        } else {
            self.playing = true;
            self.pending.pop_front()
        }
    }

    /// The in-flight payload completed. Returns the next payload to start,
    /// or `None` after transitioning back to idle.
    pub fn on_playback_complete(&mut self) -> Option<Bytes> {
        match self.pending.pop_front() {
            Some(next) => Some(next),
            None => {
                self.playing = false;
                None
            }
        }
    }

    /// The transport refused to start the payload we just dequeued (no live
    /// connection). The payload is dropped and the queue goes idle.
    pub fn playback_rejected(&mut self) {
        self.playing = false;
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Spawn the worker task for one guild session.
///
/// `tx` is the same sender the engine holds; the worker hands clones of it
/// to playback completion callbacks so finished payloads feed back into the
/// loop. The worker exits when every sender is dropped or the engine aborts
/// it on disconnect.
pub(crate) fn spawn_worker(
    guild: GuildId,
    transport: Arc<dyn VoiceTransport>,
    synth: Arc<SynthesisGateway>,
    tx: mpsc::UnboundedSender<SessionCommand>,
    mut rx: mpsc::UnboundedReceiver<SessionCommand>,
    stats: Arc<SessionStats>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut queue = PlaybackQueue::default();

        while let Some(command) = rx.recv().await {
            match command {
                SessionCommand::Speak { text, user } => {
                    match synth.synthesize(&text, user).await {
                        Ok(audio) => {
                            if let Some(first) = queue.enqueue(audio) {
                                start_playback(&*transport, guild, first, &tx, &mut queue);
                            }
                        }
                        Err(e) => {
                            // Terminal for this utterance only; the worker
                            // and the rest of the queue carry on.
                            warn!(guild = %guild, error = %e, "dropping utterance after synthesis failure");
                        }
                    }
                }
                SessionCommand::PlaybackDone => {
                    if let Some(next) = queue.on_playback_complete() {
                        start_playback(&*transport, guild, next, &tx, &mut queue);
                    }
                }
                SessionCommand::Stop => {
                    transport.stop_playback(guild);
                }
            }

            stats.queued.store(queue.len(), Ordering::Release);
            stats.playing.store(queue.is_playing(), Ordering::Release);
        }

        debug!(guild = %guild, "session worker stopped");
    })
}

fn start_playback(
    transport: &dyn VoiceTransport,
    guild: GuildId,
    audio: Bytes,
    tx: &mpsc::UnboundedSender<SessionCommand>,
    queue: &mut PlaybackQueue,
) {
    let done = tx.clone();
    let started = transport.start_playback(
        guild,
        audio,
        Box::new(move || {
            let _ = done.send(SessionCommand::PlaybackDone);
        }),
    );
    if !started {
        // No live connection means nothing to drain into; the payload is
        // dropped rather than surfaced as an error.
        debug!(guild = %guild, "connection gone, dropping queued audio");
        queue.playback_rejected();
    }
}
