//! Community user directory and gamification scores.
//!
//! A single storage key holds the directory of every user who has logged
//! in: name, avatar, cumulative score, last-active instant. Score deltas
//! are awarded on message submission regardless of whether the model call
//! succeeds.

use super::kv::KvStore;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Points for submitting a message.
pub const POINTS_PER_MESSAGE: i64 = 10;
/// Extra points when the message carries an attachment.
pub const POINTS_PER_ATTACHMENT: i64 = 50;
/// Points for using a follow-up suggestion.
pub const POINTS_PER_SUGGESTION: i64 = 5;

const COMMUNITY_USERS_KEY: &str = "finguru-community-users";
const CURRENT_USER_KEY: &str = "finguru-current-user";

/// A community member profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub avatar_id: String,
    pub score: i64,
    pub last_active: DateTime<Utc>,
}

/// Directory of community users backed by the key-value store.
pub struct CommunityStore {
    kv: KvStore,
}

impl CommunityStore {
    #[must_use]
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    fn load(&self) -> Vec<UserProfile> {
        let raw = match self.kv.get(COMMUNITY_USERS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read community users");
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "discarding unreadable community directory");
            Vec::new()
        })
    }

    fn save(&self, users: &[UserProfile]) -> Result<()> {
        let raw = serde_json::to_string(users)
            .map_err(|e| crate::error::ChatError::Storage(e.to_string()))?;
        self.kv.set(COMMUNITY_USERS_KEY, &raw)
    }

    /// Log a user in by name (case-insensitive match).
    ///
    /// An existing user gets a refreshed avatar and last-active instant; a
    /// new user gets a generated id and a zero score.
    pub fn login(&self, name: &str, avatar_id: &str) -> Result<UserProfile> {
        let now = Utc::now();
        let mut users = self.load();
        let lowered = name.to_lowercase();

        let profile = if let Some(user) = users
            .iter_mut()
            .find(|user| user.name.to_lowercase() == lowered)
        {
            user.avatar_id = avatar_id.to_owned();
            user.last_active = now;
            user.clone()
        } else {
            let user = UserProfile {
                id: new_user_id(now),
                name: name.to_owned(),
                avatar_id: avatar_id.to_owned(),
                score: 0,
                last_active: now,
            };
            users.push(user.clone());
            user
        };

        self.save(&users)?;
        Ok(profile)
    }

    /// Add `points` to a user's score and refresh their last-active instant.
    ///
    /// Awarding against an unknown id is logged and ignored.
    pub fn award(&self, user_id: &str, points: i64) -> Result<()> {
        let mut users = self.load();
        let Some(user) = users.iter_mut().find(|user| user.id == user_id) else {
            warn!(user_id, "attempted to award points to unknown user");
            return Ok(());
        };
        user.score += points;
        user.last_active = Utc::now();
        self.save(&users)
    }

    /// All community profiles.
    #[must_use]
    pub fn community(&self) -> Vec<UserProfile> {
        self.load()
    }

    /// Number of registered users.
    #[must_use]
    pub fn total_users(&self) -> usize {
        self.load().len()
    }

    /// Persist the active session user so a restart skips the login step.
    pub fn save_session(&self, user: &UserProfile) -> Result<()> {
        let raw = serde_json::to_string(user)
            .map_err(|e| crate::error::ChatError::Storage(e.to_string()))?;
        self.kv.set(CURRENT_USER_KEY, &raw)
    }

    /// Restore the previously active session user, if any. An unreadable
    /// record is discarded with a log line.
    #[must_use]
    pub fn restore_session(&self) -> Option<UserProfile> {
        let raw = self.kv.get(CURRENT_USER_KEY).ok().flatten()?;
        serde_json::from_str(&raw)
            .inspect_err(|e| warn!(error = %e, "discarding unreadable session record"))
            .ok()
    }

    /// Clear the active session (logout).
    pub fn clear_session(&self) -> Result<()> {
        self.kv.remove(CURRENT_USER_KEY)
    }
}

/// Generate a unique user id: `user_{epoch_millis}_{9 random alphanumerics}`.
fn new_user_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!(
        "user_{}_{}",
        now.timestamp_millis(),
        suffix.to_lowercase()
    )
}
