//! Usage statistics
//!
//! `StatsRecorder` is the async face of the SQLite [`Database`]. Every call
//! runs on tokio's blocking pool so request tasks never stall the scheduler
//! on disk I/O.

use crate::error::{Result, StudyGuideError};
use crate::storage::{ChannelStats, Database, QuestionRecord, QuestionStats, UserQuestionCount};
use crate::{ChannelId, UserId};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Which of the two writes behind an answered question went through.
///
/// The history insert and the counter increment are separate statements
/// without a shared transaction, so one can land while the other fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    pub history_logged: bool,
    pub counter_incremented: bool,
}

impl RecordOutcome {
    pub fn is_complete(&self) -> bool {
        self.history_logged && self.counter_incremented
    }
}

/// Records answered questions and uploads, and serves aggregate queries
#[derive(Clone)]
pub struct StatsRecorder {
    db: Arc<Mutex<Database>>,
}

impl StatsRecorder {
    /// Open (or create) the statistics database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            crate::utils::ensure_directory(parent)?;
        }
        let db = Database::new(path)?;
        log::info!("📊 Statistics database opened at {}", path.display());
        Ok(Self::from_database(db))
    }

    /// In-memory statistics (for testing)
    pub fn memory() -> Result<Self> {
        Ok(Self::from_database(Database::memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| StudyGuideError::Storage("Statistics database lock poisoned".to_string()))?;
            op(&*guard)
        })
        .await?
    }

    /// Log an answered question and bump the channel counter.
    ///
    /// Failures of either write are logged, not returned; the caller still
    /// delivers its answer.
    pub async fn record_question(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        question: &str,
        answer: &str,
    ) -> RecordOutcome {
        self.record_question_at(channel_id, user_id, question, answer, Utc::now())
            .await
    }

    pub async fn record_question_at(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        question: &str,
        answer: &str,
        at: DateTime<Utc>,
    ) -> RecordOutcome {
        let question = question.to_string();
        let answer = answer.to_string();

        let history_logged = match self
            .with_db(move |db| db.insert_question(channel_id, user_id, &question, &answer, at))
            .await
        {
            Ok(id) => {
                log::debug!("Logged question {} for channel {}", id, channel_id);
                true
            }
            Err(e) => {
                log::error!("❌ Failed to log question for channel {}: {}", channel_id, e);
                false
            }
        };

        let counter_incremented = match self
            .with_db(move |db| db.increment_questions(channel_id, at))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                log::error!("❌ Failed to update question counter for channel {}: {}", channel_id, e);
                false
            }
        };

        let outcome = RecordOutcome {
            history_logged,
            counter_incremented,
        };
        if !outcome.is_complete() {
            log::warn!(
                "Channel {} counter and history may have drifted (history: {}, counter: {})",
                channel_id,
                history_logged,
                counter_incremented
            );
        }
        outcome
    }

    /// Upsert the channel row after a knowledge-base write
    pub async fn record_upload(&self, channel_id: ChannelId, data_size: u64) -> Result<()> {
        let now = Utc::now();
        self.with_db(move |db| db.upsert_upload(channel_id, data_size, now))
            .await
    }

    pub async fn channel_stats(&self, channel_id: ChannelId) -> Result<Option<ChannelStats>> {
        self.with_db(move |db| db.channel_stats(channel_id)).await
    }

    pub async fn top_channels(&self, limit: usize) -> Result<Vec<ChannelStats>> {
        self.with_db(move |db| db.top_channels(limit)).await
    }

    pub async fn question_stats_for_channel(&self, channel_id: ChannelId) -> Result<QuestionStats> {
        self.with_db(move |db| db.question_stats(channel_id)).await
    }

    pub async fn top_users(&self, channel_id: ChannelId, limit: usize) -> Result<Vec<UserQuestionCount>> {
        self.with_db(move |db| db.top_users(channel_id, limit)).await
    }

    pub async fn last_question_at(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>> {
        self.with_db(move |db| db.last_question_at(user_id)).await
    }

    pub async fn recent_questions(&self, channel_id: ChannelId, limit: usize) -> Result<Vec<QuestionRecord>> {
        self.with_db(move |db| db.recent_questions(channel_id, limit))
            .await
    }

    /// Drop the aggregate row of a channel; returns whether one existed
    pub async fn delete_channel(&self, channel_id: ChannelId) -> Result<bool> {
        self.with_db(move |db| db.delete_channel_stats(channel_id))
            .await
    }

    /// Delete the question history of a channel; returns removed rows
    pub async fn purge_history(&self, channel_id: ChannelId) -> Result<usize> {
        self.with_db(move |db| db.purge_history(channel_id)).await
    }

    /// Consistent copy of the database for backups
    pub async fn snapshot_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path: PathBuf = path.as_ref().to_path_buf();
        self.with_db(move |db| db.vacuum_into(&path)).await
    }
}
