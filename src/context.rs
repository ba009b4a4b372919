//! Rolling per-user question context
//!
//! Lives in process memory only: populated lazily on the first answered
//! question of a user, never persisted, and gone after a restart. The map
//! itself is an LRU cache so an unbounded number of users cannot grow it
//! without limit.

use crate::UserId;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Default number of questions remembered per user
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Tracks each user's most recent questions, oldest first
pub struct UserContextTracker {
    window: usize,
    entries: Mutex<LruCache<UserId, VecDeque<String>>>,
}

impl UserContextTracker {
    /// `window` questions per user, at most `capacity` users
    pub fn new(window: usize, capacity: NonZeroUsize) -> Self {
        Self {
            window: window.max(1),
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Recent questions of a user, most recent last (empty if none)
    pub fn get(&self, user_id: UserId) -> Vec<String> {
        match self.entries.lock() {
            Ok(mut entries) => entries
                .get(&user_id)
                .map(|questions| questions.iter().cloned().collect())
                .unwrap_or_default(),
            Err(_) => {
                log::error!("User context lock poisoned; answering without context");
                Vec::new()
            }
        }
    }

    /// Push a question, dropping the oldest entries beyond the window
    pub fn append(&self, user_id: UserId, question: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            log::error!("User context lock poisoned; dropping context for user {}", user_id);
            return;
        };

        let questions = entries.get_or_insert_mut(user_id, VecDeque::new);
        questions.push_back(question.to_string());
        while questions.len() > self.window {
            questions.pop_front();
        }
    }

    /// Number of users currently tracked
    pub fn tracked_users(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl Default for UserContextTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_WINDOW, NonZeroUsize::new(10_000).unwrap_or(NonZeroUsize::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_has_empty_context() {
        let tracker = UserContextTracker::default();
        assert!(tracker.get(1).is_empty());
    }

    #[test]
    fn test_keeps_five_most_recent() {
        let tracker = UserContextTracker::default();
        for i in 1..=7 {
            tracker.append(1, &format!("q{}", i));
        }

        assert_eq!(tracker.get(1), vec!["q3", "q4", "q5", "q6", "q7"]);
    }

    #[test]
    fn test_users_are_independent() {
        let tracker = UserContextTracker::default();
        tracker.append(1, "mine");
        tracker.append(2, "theirs");

        assert_eq!(tracker.get(1), vec!["mine"]);
        assert_eq!(tracker.get(2), vec!["theirs"]);
    }

    #[test]
    fn test_least_recent_user_is_evicted() {
        let tracker = UserContextTracker::new(5, NonZeroUsize::new(2).unwrap());
        tracker.append(1, "a");
        tracker.append(2, "b");
        tracker.append(3, "c");

        assert_eq!(tracker.tracked_users(), 2);
        assert!(tracker.get(1).is_empty());
        assert_eq!(tracker.get(3), vec!["c"]);
    }
}
