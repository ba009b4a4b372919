//! Storage functionality for studyguide-rs
//!
//! This module provides the statistics store using embedded SQLite.

pub mod database;
pub mod migrations;
pub mod schema;

// Re-export main types
pub use database::Database;

use crate::{ChannelId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate row for one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub channel_id: ChannelId,

    /// Answered questions, incremented once per answer
    pub questions_answered: u64,

    /// Size of the current knowledge base in bytes
    pub data_size: u64,

    /// Last knowledge-base write or answered question
    pub last_updated: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionRecord {
    pub id: i64,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Totals over a channel's question history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuestionStats {
    pub total_questions: u64,
    pub unique_users: u64,
}

/// Question count of one user in one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserQuestionCount {
    pub user_id: UserId,
    pub question_count: u64,
}
