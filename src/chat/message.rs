//! Conversation message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Reader feedback on a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feedback {
    ThumbsUp,
    ThumbsDown,
}

/// A single transcript entry.
///
/// User messages are created complete and never mutated. Bot messages start
/// as an empty placeholder with `is_thinking` set and are mutated in place as
/// stream chunks arrive; a placeholder that never received content is dropped
/// from the transcript when its turn ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Data-URI image attached to the message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Placeholder flag: set until the first content chunk arrives.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_thinking: bool,
    /// The message body is a user-facing error, not a model reply.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_suggestions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

impl Message {
    /// Create a complete user message.
    #[must_use]
    pub fn user(text: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            id: next_message_id(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            image_url,
            is_thinking: false,
            is_error: false,
            follow_up_suggestions: None,
            feedback: None,
        }
    }

    /// Create a complete bot message (used for the initial greeting).
    #[must_use]
    pub fn bot(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: Sender::Bot,
            text: text.into(),
            timestamp: Utc::now(),
            image_url: None,
            is_thinking: false,
            is_error: false,
            follow_up_suggestions: None,
            feedback: None,
        }
    }

    /// Create an empty bot placeholder awaiting its first stream chunk.
    #[must_use]
    pub fn bot_placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: Sender::Bot,
            text: String::new(),
            timestamp: Utc::now(),
            image_url: None,
            is_thinking: true,
            is_error: false,
            follow_up_suggestions: None,
            feedback: None,
        }
    }
}

static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Allocate a message identifier derived from the creation time.
///
/// IDs are epoch milliseconds, bumped past the previous allocation so two
/// messages created within the same millisecond still order correctly.
#[must_use]
pub fn next_message_id() -> String {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut prev = LAST_ID.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_ID.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next.to_string(),
            Err(actual) => prev = actual,
        }
    }
}
