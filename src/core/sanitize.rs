//! Text sanitization for speech.
//!
//! Chat messages carry markup, mention tokens and links that read terribly
//! out loud. [`sanitize`] turns raw message text into plain speakable text
//! and classifies messages that should collapse to a fixed phrase instead
//! (emoji-only messages). It is a pure function: no state, no failure modes,
//! malformed input yields empty output.
//!
//! [`speakable_text`] layers the caller policy on top: fixed phrases for
//! emoji-only messages, attachment and sticker markers, and length capping.

use once_cell::sync::Lazy;
use regex::Regex;

/// Spoken in place of spoiler-marked spans.
pub const SPOILER_PLACEHOLDER: &str = "spoiler";

/// Spoken in place of bare URLs.
pub const URL_PLACEHOLDER: &str = "URL";

/// Fixed phrase for a message that is only Unicode emoji.
pub const EMOJI_PHRASE: &str = "emoji";

/// Fixed phrase for a message that is only a custom guild emoji token.
pub const CUSTOM_EMOJI_PHRASE: &str = "server emoji";

/// Appended when a message exceeds the utterance length cap.
const TRUNCATED_MARKER: &str = " (truncated)";

/// Appended when the message carried attachments.
const ATTACHMENT_MARKER: &str = " attachment";

/// Appended when the message carried stickers.
const STICKER_MARKER: &str = " sticker";

static SPOILER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|\|.*?\|\|").unwrap());
static BOLD_UNDERLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_]").unwrap());
static STRIKETHROUGH: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~").unwrap());
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static CUSTOM_EMOJI: Lazy<Regex> = Lazy::new(|| Regex::new(r"<a?:[A-Za-z0-9_]+:[0-9]+>").unwrap());
static USER_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?[0-9]+>").unwrap());
static CHANNEL_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"<#[0-9]+>").unwrap());
static ROLE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@&[0-9]+>").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static CUSTOM_EMOJI_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<a?:\w+:[0-9]+>$").unwrap());
static UNICODE_EMOJI_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\x{10000}-\x{10FFFF}]+$").unwrap());

/// What kind of message the raw input was, before any stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Ordinary text; the sanitized form is what gets spoken.
    Normal,
    /// One or more literal Unicode emoji and nothing else.
    EmojiOnly,
    /// Exactly one custom guild emoji token and nothing else.
    CustomEmojiOnly,
}

/// Result of sanitizing one raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    pub kind: MessageKind,
}

/// Normalize raw message text into plain speakable text and classify it.
///
/// Classification looks at the raw input, not the stripped text: a message
/// that is nothing but an emoji is still `EmojiOnly` even though stripping
/// would leave it empty.
pub fn sanitize(raw: &str) -> Sanitized {
    let raw = raw.trim();

    let kind = if CUSTOM_EMOJI_ONLY.is_match(raw) {
        MessageKind::CustomEmojiOnly
    } else if UNICODE_EMOJI_ONLY.is_match(raw) {
        MessageKind::EmojiOnly
    } else {
        MessageKind::Normal
    };

    let mut text = SPOILER.replace_all(raw, SPOILER_PLACEHOLDER).into_owned();
    text = BOLD_UNDERLINE.replace_all(&text, "").into_owned();
    text = ITALIC.replace_all(&text, "").into_owned();
    text = STRIKETHROUGH.replace_all(&text, "").into_owned();
    text = CODE_FENCE.replace_all(&text, "").into_owned();
    text = INLINE_CODE.replace_all(&text, "$1").into_owned();
    text = CUSTOM_EMOJI.replace_all(&text, "").into_owned();
    text = USER_MENTION.replace_all(&text, "").into_owned();
    text = CHANNEL_REF.replace_all(&text, "").into_owned();
    text = ROLE_MENTION.replace_all(&text, "").into_owned();
    text = URL.replace_all(&text, URL_PLACEHOLDER).into_owned();
    text = WHITESPACE_RUN.replace_all(&text, " ").trim().to_string();

    Sanitized { text, kind }
}

/// Apply the caller policy: fixed phrases for emoji messages, markers for
/// attachments and stickers, and the length cap.
///
/// Returns `None` when the message produces no speech at all (e.g. a
/// mention-only message that sanitizes to nothing).
pub fn speakable_text(
    sanitized: &Sanitized,
    has_attachment: bool,
    has_sticker: bool,
    max_chars: usize,
) -> Option<String> {
    match sanitized.kind {
        MessageKind::CustomEmojiOnly => return Some(CUSTOM_EMOJI_PHRASE.to_string()),
        MessageKind::EmojiOnly => return Some(EMOJI_PHRASE.to_string()),
        MessageKind::Normal => {}
    }

    let mut text = sanitized.text.clone();
    if has_attachment {
        text.push_str(ATTACHMENT_MARKER);
    }
    if has_sticker {
        text.push_str(STICKER_MARKER);
    }

    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    if text.chars().count() > max_chars {
        let mut capped: String = text.chars().take(max_chars).collect();
        capped.push_str(TRUNCATED_MARKER);
        return Some(capped);
    }

    Some(text)
}
