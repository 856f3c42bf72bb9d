//! Conversation lockdown state.
//!
//! The lock is anchored to an absolute unlock instant, persisted as epoch
//! milliseconds, so a process restart resumes the countdown instead of
//! resetting it. Remaining time is always recomputed from the wall clock,
//! never decremented.

use chrono::{DateTime, Utc};

/// How long a triggered lockdown lasts.
pub const LOCKDOWN_DURATION_SECS: i64 = 300;

/// Wall-clock-anchored conversation lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockdownState {
    unlock_at_millis: Option<i64>,
}

impl LockdownState {
    /// Rebuild from a persisted epoch-millisecond string.
    ///
    /// An unparsable or already-elapsed value restores to unlocked; the
    /// caller is expected to remove the stale storage entry in that case.
    #[must_use]
    pub fn restore(stored: Option<&str>, now: DateTime<Utc>) -> Self {
        let unlock_at_millis = stored
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|&end| end > now.timestamp_millis());
        Self { unlock_at_millis }
    }

    /// Engage the lock for [`LOCKDOWN_DURATION_SECS`] from `now`.
    ///
    /// Returns the absolute unlock instant (epoch millis) for persistence.
    pub fn engage(&mut self, now: DateTime<Utc>) -> i64 {
        let end = now.timestamp_millis() + LOCKDOWN_DURATION_SECS * 1000;
        self.unlock_at_millis = Some(end);
        end
    }

    /// Whether the lock is active at `now`.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.unlock_at_millis
            .is_some_and(|end| end > now.timestamp_millis())
    }

    /// Seconds until the lock releases, recomputed from the wall clock.
    /// Zero when unlocked.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        let Some(end) = self.unlock_at_millis else {
            return 0;
        };
        let millis_left = end - now.timestamp_millis();
        if millis_left <= 0 {
            0
        } else {
            // Round to the nearest second, matching the original countdown.
            (millis_left + 500) / 1000
        }
    }

    /// Drop the lock (expiry or explicit unlock).
    pub fn clear(&mut self) {
        self.unlock_at_millis = None;
    }

    /// The persisted unlock instant, if any.
    #[must_use]
    pub fn unlock_at_millis(&self) -> Option<i64> {
        self.unlock_at_millis
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use chrono::Duration;

    #[test]
    fn engage_locks_for_the_full_duration() {
        let now = Utc::now();
        let mut state = LockdownState::default();
        let end = state.engage(now);
        assert_eq!(end, now.timestamp_millis() + 300_000);
        assert!(state.is_locked(now));
        assert_eq!(state.remaining_seconds(now), 300);
    }

    #[test]
    fn remaining_is_recomputed_not_decremented() {
        let now = Utc::now();
        let mut state = LockdownState::default();
        state.engage(now);
        let later = now + Duration::seconds(120);
        assert_eq!(state.remaining_seconds(later), 180);
        // Re-asking at the same instant gives the same answer.
        assert_eq!(state.remaining_seconds(later), 180);
    }

    #[test]
    fn restore_resumes_the_countdown() {
        let now = Utc::now();
        let mut state = LockdownState::default();
        let end = state.engage(now);

        // Simulate a reload two minutes in.
        let reload = now + Duration::seconds(120);
        let restored = LockdownState::restore(Some(&end.to_string()), reload);
        assert!(restored.is_locked(reload));
        assert_eq!(restored.remaining_seconds(reload), 180);
    }

    #[test]
    fn restore_of_elapsed_lock_is_unlocked() {
        let now = Utc::now();
        let stale = (now.timestamp_millis() - 1000).to_string();
        let restored = LockdownState::restore(Some(&stale), now);
        assert!(!restored.is_locked(now));
        assert_eq!(restored.remaining_seconds(now), 0);
    }

    #[test]
    fn restore_of_garbage_is_unlocked() {
        let now = Utc::now();
        assert!(!LockdownState::restore(Some("not-a-number"), now).is_locked(now));
        assert!(!LockdownState::restore(None, now).is_locked(now));
    }

    #[test]
    fn clear_releases_immediately() {
        let now = Utc::now();
        let mut state = LockdownState::default();
        state.engage(now);
        state.clear();
        assert!(!state.is_locked(now));
        assert!(state.unlock_at_millis().is_none());
    }
}
