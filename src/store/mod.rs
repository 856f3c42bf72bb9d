//! Client-side chat state: transcript, settings, lockdown, scoring.
//!
//! [`ChatStore`] is the reconciliation point between the chunk stream and
//! the transcript. It is single-writer by design: one request in flight per
//! conversation, gated by `is_loading`; concurrent submissions are a caller
//! error, not a contract the store enforces. Every transcript or settings
//! mutation is mirrored to the key-value store; storage failures are logged
//! and never interrupt the conversation.

pub mod community;
pub mod kv;
pub mod lockdown;

pub use community::{
    CommunityStore, POINTS_PER_ATTACHMENT, POINTS_PER_MESSAGE, POINTS_PER_SUGGESTION, UserProfile,
};
pub use kv::KvStore;
pub use lockdown::{LOCKDOWN_DURATION_SECS, LockdownState};

use crate::chat::{Feedback, Message, Sender, StreamChunk, UserSettings, next_message_id};
use crate::relay::ChatRequest;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::warn;

/// Greeting seeded into every fresh transcript.
const GREETING: &str = "Hello! I'm FinGuru, your personal AI financial specialist. Think of me as \
     your guide to navigating the global financial and business landscape. Whether you're a \
     startup founder creating a strategy, an investor analyzing markets, or just want to build a \
     solid budget, I'm here to provide clear, data-driven insights. What's on your mind today?";

/// Maintenance password that releases an active lockdown.
const UNLOCK_PASSWORD: &str = "Rasha";

fn history_key(user_id: &str) -> String {
    format!("finguru-chat-history-{user_id}")
}

fn settings_key(user_id: &str) -> String {
    format!("finguru-user-settings-{user_id}")
}

fn lockdown_key(user_id: &str) -> String {
    format!("finguru-lockdown-end-time-{user_id}")
}

/// Why a submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitBlocked {
    /// The conversation is locked down.
    #[error("conversation is locked")]
    Locked,
    /// A request is already in flight.
    #[error("a request is already in flight")]
    Busy,
}

#[derive(Debug, PartialEq, Eq)]
enum TurnControl {
    Continue,
    Stop,
}

/// Per-user chat state mirrored to durable storage.
pub struct ChatStore {
    kv: KvStore,
    community: CommunityStore,
    user: UserProfile,
    messages: Vec<Message>,
    settings: UserSettings,
    lockdown: LockdownState,
    is_loading: bool,
}

impl ChatStore {
    /// Restore the store for `user`, seeding a greeting when no transcript
    /// exists. Unreadable stored state is discarded with a log line rather
    /// than failing the session.
    #[must_use]
    pub fn open(kv: KvStore, user: UserProfile) -> Self {
        let now = Utc::now();

        let messages = match kv.get(&history_key(&user.id)) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable transcript");
                vec![greeting_message()]
            }),
            Ok(None) => vec![greeting_message()],
            Err(e) => {
                warn!(error = %e, "failed to load transcript");
                vec![greeting_message()]
            }
        };

        let settings = match kv.get(&settings_key(&user.id)) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable settings");
                UserSettings::default()
            }),
            Ok(None) => UserSettings::default(),
            Err(e) => {
                warn!(error = %e, "failed to load settings");
                UserSettings::default()
            }
        };

        let stored_lockdown = kv.get(&lockdown_key(&user.id)).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load lockdown state");
            None
        });
        let lockdown = LockdownState::restore(stored_lockdown.as_deref(), now);
        if stored_lockdown.is_some() && !lockdown.is_locked(now) {
            // Stale entry from a lock that elapsed while we were away.
            if let Err(e) = kv.remove(&lockdown_key(&user.id)) {
                warn!(error = %e, "failed to clear stale lockdown entry");
            }
        }

        let community = CommunityStore::new(kv.clone());
        Self {
            kv,
            community,
            user,
            messages,
            settings,
            lockdown,
            is_loading: false,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    #[must_use]
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lockdown.is_locked(Utc::now())
    }

    /// Replace the settings and persist them.
    pub fn update_settings(&mut self, settings: UserSettings) {
        self.settings = settings;
        self.persist_settings();
    }

    /// Submit a user message.
    ///
    /// On success the user message is appended and persisted, score points
    /// are awarded, `is_loading` is set, and the returned request carries
    /// the history snapshot *excluding* the new message (the model sees it
    /// as the current turn instead).
    pub fn submit(
        &mut self,
        text: &str,
        image_url: Option<String>,
    ) -> std::result::Result<ChatRequest, SubmitBlocked> {
        if self.is_locked() {
            return Err(SubmitBlocked::Locked);
        }
        if self.is_loading {
            return Err(SubmitBlocked::Busy);
        }

        let request = ChatRequest {
            message: text.to_owned(),
            history: self.messages.clone(),
            user_settings: self.settings.clone(),
            image_url: image_url.clone(),
        };

        let has_attachment = image_url.is_some();
        self.messages.push(Message::user(text, image_url));
        self.persist_messages();

        let mut points = POINTS_PER_MESSAGE;
        if has_attachment {
            points += POINTS_PER_ATTACHMENT;
        }
        self.award(points);

        self.is_loading = true;
        Ok(request)
    }

    /// Submit a follow-up suggestion; awards the suggestion bonus on top of
    /// the regular submission points.
    pub fn submit_follow_up(
        &mut self,
        suggestion: &str,
    ) -> std::result::Result<ChatRequest, SubmitBlocked> {
        let request = self.submit(suggestion, None)?;
        self.award(POINTS_PER_SUGGESTION);
        Ok(request)
    }

    /// Drive one response turn to completion, folding chunks into the
    /// transcript.
    pub async fn run_turn(&mut self, chunks: mpsc::Receiver<StreamChunk>) {
        self.run_turn_with(chunks, |_| {}).await;
    }

    /// [`run_turn`](Self::run_turn) with an observer called for every chunk
    /// before it is applied (used by the terminal client to print
    /// fragments as they arrive).
    pub async fn run_turn_with<F>(&mut self, mut chunks: mpsc::Receiver<StreamChunk>, mut observe: F)
    where
        F: FnMut(&StreamChunk),
    {
        let bot_id = next_message_id();
        while let Some(chunk) = chunks.recv().await {
            observe(&chunk);
            if self.apply_chunk(&bot_id, chunk) == TurnControl::Stop {
                break;
            }
        }
        // Guaranteed cleanup: a placeholder that never saw content is
        // dropped instead of rendering as an empty bubble, and the loading
        // gate always reopens.
        self.finish_turn(&bot_id);
    }

    fn apply_chunk(&mut self, bot_id: &str, chunk: StreamChunk) -> TurnControl {
        match chunk {
            StreamChunk::Lockdown => {
                let end = self.lockdown.engage(Utc::now());
                if let Err(e) = self.kv.set(&lockdown_key(&self.user.id), &end.to_string()) {
                    warn!(error = %e, "failed to persist lockdown end time");
                }
                // No bot message for this turn, even if chunks already
                // materialized a placeholder.
                self.messages
                    .retain(|message| message.id != bot_id || !message.is_thinking);
                self.persist_messages();
                TurnControl::Stop
            }
            StreamChunk::Text { text } => {
                self.fold_content(bot_id, &text, None, false);
                TurnControl::Continue
            }
            StreamChunk::Chart { text, image_url } => {
                self.fold_content(bot_id, &text, image_url, false);
                TurnControl::Continue
            }
            StreamChunk::Error { text } => {
                self.fold_content(bot_id, &text, None, true);
                TurnControl::Continue
            }
        }
    }

    fn fold_content(&mut self, bot_id: &str, text: &str, image_url: Option<String>, is_error: bool) {
        if !self.messages.iter().any(|message| message.id == bot_id) {
            self.messages.push(Message::bot_placeholder(bot_id));
        }
        if let Some(message) = self.messages.iter_mut().find(|message| message.id == bot_id) {
            message.text.push_str(text);
            if image_url.is_some() {
                message.image_url = image_url;
            }
            if is_error {
                message.is_error = true;
            }
            message.is_thinking = false;
        }
        self.persist_messages();
    }

    fn finish_turn(&mut self, bot_id: &str) {
        let before = self.messages.len();
        self.messages
            .retain(|message| message.id != bot_id || !message.is_thinking);
        if self.messages.len() != before {
            self.persist_messages();
        }
        self.is_loading = false;
    }

    /// Recompute the lockdown countdown; clears the lock and its storage
    /// entry once the unlock instant has passed. Returns remaining seconds.
    pub fn poll_lockdown(&mut self) -> i64 {
        let now = Utc::now();
        if self.lockdown.unlock_at_millis().is_some() && !self.lockdown.is_locked(now) {
            self.lockdown.clear();
            self.remove_lockdown_entry();
        }
        self.lockdown.remaining_seconds(now)
    }

    /// Release an active lock with the maintenance password.
    ///
    /// Clears the persisted unlock instant too, so the lock cannot silently
    /// re-engage on the next restore.
    pub fn unlock(&mut self, password: &str) -> bool {
        if password != UNLOCK_PASSWORD {
            return false;
        }
        self.lockdown.clear();
        self.remove_lockdown_entry();
        true
    }

    /// Toggle feedback on a message: same value clears it.
    pub fn set_feedback(&mut self, message_id: &str, feedback: Feedback) {
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| message.id == message_id)
        {
            message.feedback = if message.feedback == Some(feedback) {
                None
            } else {
                Some(feedback)
            };
            self.persist_messages();
        }
    }

    /// Reset the transcript to the initial greeting.
    pub fn clear_chat(&mut self) {
        self.messages = vec![greeting_message()];
        self.persist_messages();
    }

    /// Render the transcript as a Markdown document.
    #[must_use]
    pub fn export_markdown(&self) -> String {
        let header = format!(
            "# FinGuru Chat Export\n\n**Exported on:** {}\n**Conversation with:** {}\n\n---\n\n",
            Utc::now().to_rfc3339(),
            self.user.name,
        );
        let body = self
            .messages
            .iter()
            .map(|message| {
                let sender = match message.sender {
                    Sender::Bot => "FinGuru",
                    Sender::User => self.user.name.as_str(),
                };
                let text = if message.sender == Sender::Bot {
                    format!("> {}", message.text.replace('\n', "\n> "))
                } else {
                    message.text.clone()
                };
                format!("**{sender}** (_{}_):\n\n{text}", message.timestamp.to_rfc3339())
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        header + &body
    }

    /// Render the transcript as pretty-printed JSON.
    #[must_use]
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.messages).unwrap_or_default()
    }

    fn award(&self, points: i64) {
        if let Err(e) = self.community.award(&self.user.id, points) {
            warn!(error = %e, "failed to award points");
        }
    }

    fn persist_messages(&self) {
        match serde_json::to_string(&self.messages) {
            Ok(raw) => {
                if let Err(e) = self.kv.set(&history_key(&self.user.id), &raw) {
                    warn!(error = %e, "failed to persist transcript");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize transcript"),
        }
    }

    fn persist_settings(&self) {
        match serde_json::to_string(&self.settings) {
            Ok(raw) => {
                if let Err(e) = self.kv.set(&settings_key(&self.user.id), &raw) {
                    warn!(error = %e, "failed to persist settings");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize settings"),
        }
    }

    fn remove_lockdown_entry(&self) {
        if let Err(e) = self.kv.remove(&lockdown_key(&self.user.id)) {
            warn!(error = %e, "failed to clear lockdown entry");
        }
    }
}

fn greeting_message() -> Message {
    Message::bot("initial", GREETING)
}
