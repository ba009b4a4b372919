//! Per-user cooldown between answered questions
//!
//! The source of truth is the question history; the in-memory LRU cache only
//! holds each recent user's latest answer time so the common path skips
//! SQLite. An evicted user falls back to the history lookup.

use crate::stats::StatsRecorder;
use crate::UserId;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default cooldown between two answered questions of one user
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

pub struct RateLimiter {
    window: chrono::Duration,
    stats: Arc<StatsRecorder>,
    last_answered: Mutex<LruCache<UserId, DateTime<Utc>>>,
}

impl RateLimiter {
    /// Cooldown of `window`, caching at most `capacity` users in memory
    pub fn new(window: Duration, capacity: NonZeroUsize, stats: Arc<StatsRecorder>) -> Self {
        let window = chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::seconds(5));
        Self {
            window,
            stats,
            last_answered: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// True iff the user's last answered question is strictly less than the
    /// window old
    pub async fn is_limited(&self, user_id: UserId) -> bool {
        self.is_limited_at(user_id, Utc::now()).await
    }

    pub async fn is_limited_at(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        match self.last_answered_at(user_id).await {
            Some(last) => now - last < self.window,
            None => false,
        }
    }

    /// Remember that `user_id` got an answer at `at`
    pub fn mark(&self, user_id: UserId, at: DateTime<Utc>) {
        if let Ok(mut cache) = self.last_answered.lock() {
            let latest = cache.peek(&user_id).map_or(at, |last| (*last).max(at));
            cache.put(user_id, latest);
        }
    }

    /// Users whose last answer time is held in memory
    pub fn cached_users(&self) -> usize {
        self.last_answered.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    async fn last_answered_at(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        let cached = self
            .last_answered
            .lock()
            .ok()
            .and_then(|mut cache| cache.get(&user_id).copied());
        if cached.is_some() {
            return cached;
        }

        match self.stats.last_question_at(user_id).await {
            Ok(Some(last)) => {
                self.mark(user_id, last);
                Some(last)
            }
            Ok(None) => None,
            Err(e) => {
                // An unreadable history must not lock users out
                log::warn!("Rate limit lookup failed for user {}: {}", user_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(users: usize) -> NonZeroUsize {
        NonZeroUsize::new(users).unwrap()
    }

    fn limiter() -> RateLimiter {
        let stats = Arc::new(StatsRecorder::memory().unwrap());
        RateLimiter::new(DEFAULT_COOLDOWN, capacity(100), stats)
    }

    #[tokio::test]
    async fn test_no_record_is_not_limited() {
        assert!(!limiter().is_limited(7).await);
    }

    #[tokio::test]
    async fn test_window_boundary_is_exclusive() {
        let limiter = limiter();
        let asked = Utc::now();
        limiter.mark(7, asked);

        let just_before = asked + chrono::Duration::milliseconds(4_999);
        let exactly = asked + chrono::Duration::seconds(5);
        let after = asked + chrono::Duration::seconds(6);

        assert!(limiter.is_limited_at(7, asked).await);
        assert!(limiter.is_limited_at(7, just_before).await);
        assert!(!limiter.is_limited_at(7, exactly).await);
        assert!(!limiter.is_limited_at(7, after).await);
    }

    #[tokio::test]
    async fn test_falls_back_to_history() {
        let stats = Arc::new(StatsRecorder::memory().unwrap());
        let asked = Utc::now() - chrono::Duration::seconds(2);
        stats.record_question_at(1, 7, "q", "a", asked).await;

        let limiter = RateLimiter::new(DEFAULT_COOLDOWN, capacity(100), stats);
        assert!(limiter.is_limited_at(7, asked + chrono::Duration::seconds(2)).await);
        assert!(!limiter.is_limited_at(8, asked).await);
    }

    #[tokio::test]
    async fn test_mark_keeps_latest() {
        let limiter = limiter();
        let now = Utc::now();
        limiter.mark(3, now);
        limiter.mark(3, now - chrono::Duration::seconds(60));

        assert!(limiter.is_limited_at(3, now + chrono::Duration::seconds(1)).await);
    }

    #[tokio::test]
    async fn test_memory_is_bounded() {
        let limiter = RateLimiter::new(DEFAULT_COOLDOWN, capacity(10), Arc::new(StatsRecorder::memory().unwrap()));
        let long_ago = Utc::now() - chrono::Duration::days(30);
        for user in 0..1_000 {
            limiter.mark(user, long_ago);
        }
        assert_eq!(limiter.cached_users(), 10);

        let now = Utc::now();
        limiter.mark(5_000, now);
        assert_eq!(limiter.cached_users(), 10);
        assert!(limiter.is_limited_at(5_000, now).await);
    }

    #[tokio::test]
    async fn test_evicted_user_falls_back_to_history() {
        let stats = Arc::new(StatsRecorder::memory().unwrap());
        let asked = Utc::now();
        stats.record_question_at(1, 7, "q", "a", asked).await;

        let limiter = RateLimiter::new(DEFAULT_COOLDOWN, capacity(1), stats);
        limiter.mark(7, asked);
        limiter.mark(8, asked);

        assert!(limiter.is_limited_at(7, asked + chrono::Duration::seconds(1)).await);
    }
}
