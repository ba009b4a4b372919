//! Most recent exchange per channel
//!
//! One slot per channel, overwritten on every answer. In memory only and
//! bounded by an LRU over channels.

use crate::{ChannelId, UserId};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// The last answered question of a channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
}

/// Channel -> latest snapshot
pub struct DebugSnapshots {
    slots: Mutex<LruCache<ChannelId, DebugSnapshot>>,
}

impl DebugSnapshots {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Replace the channel's snapshot
    pub fn update(&self, channel_id: ChannelId, snapshot: DebugSnapshot) {
        match self.slots.lock() {
            Ok(mut slots) => {
                slots.put(channel_id, snapshot);
            }
            Err(_) => log::error!("Debug snapshot lock poisoned; skipping channel {}", channel_id),
        }
    }

    pub fn get(&self, channel_id: ChannelId) -> Option<DebugSnapshot> {
        self.slots
            .lock()
            .ok()
            .and_then(|mut slots| slots.get(&channel_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DebugSnapshots {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(10_000).unwrap_or(NonZeroUsize::MIN))
    }
}
