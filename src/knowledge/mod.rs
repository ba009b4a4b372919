//! Channel knowledge bases
//!
//! Storage of the per-channel reference text and validation of uploads.

pub mod store;
pub mod upload;

// Re-export main types
pub use store::{DeleteOutcome, KnowledgeStore};
pub use upload::{Upload, summarize, validate_upload};

use crate::ChannelId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A channel's knowledge base as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBase {
    pub channel_id: ChannelId,

    /// Reference text (trimmed when read back)
    pub text: String,

    /// Size of the stored file in bytes
    pub size_bytes: u64,

    pub last_updated: DateTime<Utc>,
}
