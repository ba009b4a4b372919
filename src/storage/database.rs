//! SQLite database operations for studyguide-rs
//!
//! Two relations live here: `channel_stats`, one aggregate row per channel,
//! and `question_history`, the append-only log of answered questions.

use crate::error::{Result, StudyGuideError};
use crate::storage::migrations::MigrationManager;
use crate::storage::schema::SCHEMA_VERSION;
use crate::storage::{ChannelStats, QuestionRecord, QuestionStats, UserQuestionCount};
use crate::{ChannelId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StudyGuideError::Storage(format!("Failed to open database: {}", e)))?;

        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StudyGuideError::Storage(format!("Failed to create in-memory database: {}", e)))?;

        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        // WAL lets the backup snapshot read while answers are being written
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| StudyGuideError::Storage(format!("Failed to enable WAL mode: {}", e)))?;

        let migrations = MigrationManager::new(&self.conn);
        migrations.run_migrations()?;
        if !migrations.is_up_to_date()? {
            return Err(StudyGuideError::Storage(format!(
                "Statistics schema is older than version {}",
                SCHEMA_VERSION
            )));
        }

        log::debug!(
            "Statistics database ready (schema v{}, last migration {})",
            SCHEMA_VERSION,
            migrations.current_version()?.unwrap_or_default()
        );
        Ok(())
    }

    /// Append one answered question to the history log
    pub fn insert_question(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
        question: &str,
        answer: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO question_history (channel_id, user_id, question, answer, timestamp)
                 VALUES (?, ?, ?, ?, ?)",
                params![channel_id as i64, user_id as i64, question, answer, timestamp],
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to log question: {}", e)))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Bump the answered counter, creating the row if needed (single statement)
    pub fn increment_questions(&self, channel_id: ChannelId, now: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO channel_stats (channel_id, questions_answered, data_size, last_updated, created_at)
                VALUES (?1, 1, 0, ?2, ?2)
                ON CONFLICT(channel_id) DO UPDATE SET
                    questions_answered = COALESCE(questions_answered, 0) + 1,
                    last_updated = excluded.last_updated
                "#,
                params![channel_id as i64, now],
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to increment question counter: {}", e)))?;

        Ok(())
    }

    /// Record a knowledge-base write, keeping the answered count and creation time
    pub fn upsert_upload(&self, channel_id: ChannelId, data_size: u64, now: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO channel_stats (channel_id, questions_answered, data_size, last_updated, created_at)
                VALUES (?1, 0, ?2, ?3, ?3)
                ON CONFLICT(channel_id) DO UPDATE SET
                    data_size = excluded.data_size,
                    last_updated = excluded.last_updated
                "#,
                params![channel_id as i64, data_size as i64, now],
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to update channel stats: {}", e)))?;

        Ok(())
    }

    /// Get the aggregate row for a channel
    pub fn channel_stats(&self, channel_id: ChannelId) -> Result<Option<ChannelStats>> {
        self.conn
            .query_row(
                "SELECT channel_id, questions_answered, data_size, last_updated, created_at
                 FROM channel_stats WHERE channel_id = ?",
                params![channel_id as i64],
                row_to_channel_stats,
            )
            .optional()
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query channel stats: {}", e)))
    }

    /// Channels ordered by answered questions, busiest first
    pub fn top_channels(&self, limit: usize) -> Result<Vec<ChannelStats>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT channel_id, questions_answered, data_size, last_updated, created_at
                 FROM channel_stats ORDER BY questions_answered DESC, channel_id LIMIT ?",
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![limit as i64], row_to_channel_stats)
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query top channels: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| StudyGuideError::Storage(format!("Failed to process stats row: {}", e)))?);
        }
        Ok(result)
    }

    /// Total and distinct-user counts over a channel's history
    pub fn question_stats(&self, channel_id: ChannelId) -> Result<QuestionStats> {
        self.conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM question_history WHERE channel_id = ?",
                params![channel_id as i64],
                |row| {
                    Ok(QuestionStats {
                        total_questions: row.get::<_, i64>(0)? as u64,
                        unique_users: row.get::<_, i64>(1)? as u64,
                    })
                },
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query question stats: {}", e)))
    }

    /// Most active users of a channel
    pub fn top_users(&self, channel_id: ChannelId, limit: usize) -> Result<Vec<UserQuestionCount>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_id, COUNT(*) AS question_count
                 FROM question_history
                 WHERE channel_id = ?
                 GROUP BY user_id
                 ORDER BY question_count DESC, user_id
                 LIMIT ?",
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![channel_id as i64, limit as i64], |row| {
                Ok(UserQuestionCount {
                    user_id: row.get::<_, i64>(0)? as UserId,
                    question_count: row.get::<_, i64>(1)? as u64,
                })
            })
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query top users: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| StudyGuideError::Storage(format!("Failed to process user row: {}", e)))?);
        }
        Ok(result)
    }

    /// Timestamp of the user's most recent answered question, in any channel
    pub fn last_question_at(&self, user_id: UserId) -> Result<Option<DateTime<Utc>>> {
        self.conn
            .query_row(
                "SELECT timestamp FROM question_history WHERE user_id = ? ORDER BY id DESC LIMIT 1",
                params![user_id as i64],
                |row| row.get::<_, DateTime<Utc>>(0),
            )
            .optional()
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query last question: {}", e)))
    }

    /// Most recent history rows of a channel, newest first
    pub fn recent_questions(&self, channel_id: ChannelId, limit: usize) -> Result<Vec<QuestionRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, channel_id, user_id, question, answer, timestamp
                 FROM question_history WHERE channel_id = ? ORDER BY id DESC LIMIT ?",
            )
            .map_err(|e| StudyGuideError::Storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![channel_id as i64, limit as i64], row_to_question)
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query history: {}", e)))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| StudyGuideError::Storage(format!("Failed to process history row: {}", e)))?);
        }
        Ok(result)
    }

    /// Remove a channel's aggregate row; returns whether one existed
    pub fn delete_channel_stats(&self, channel_id: ChannelId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM channel_stats WHERE channel_id = ?", params![channel_id as i64])
            .map_err(|e| StudyGuideError::Storage(format!("Failed to delete channel stats: {}", e)))?;
        Ok(removed > 0)
    }

    /// Bulk-delete a channel's question history
    pub fn purge_history(&self, channel_id: ChannelId) -> Result<usize> {
        self.conn
            .execute("DELETE FROM question_history WHERE channel_id = ?", params![channel_id as i64])
            .map_err(|e| StudyGuideError::Storage(format!("Failed to purge history: {}", e)))
    }

    /// Write a consistent copy of the whole database to `path`
    pub fn vacuum_into<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let target = path.to_string_lossy().to_string();
        self.conn
            .execute("VACUUM INTO ?", params![target])
            .map_err(|e| StudyGuideError::Storage(format!("Failed to snapshot database: {}", e)))?;
        Ok(())
    }
}

fn row_to_channel_stats(row: &Row) -> rusqlite::Result<ChannelStats> {
    Ok(ChannelStats {
        channel_id: row.get::<_, i64>(0)? as ChannelId,
        questions_answered: row.get::<_, Option<i64>>(1)?.unwrap_or(0) as u64,
        data_size: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
        last_updated: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_question(row: &Row) -> rusqlite::Result<QuestionRecord> {
    Ok(QuestionRecord {
        id: row.get(0)?,
        channel_id: row.get::<_, i64>(1)? as ChannelId,
        user_id: row.get::<_, i64>(2)? as UserId,
        question: row.get(3)?,
        answer: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_upload_preserves_question_count() {
        let db = Database::memory().unwrap();
        let now = Utc::now();

        db.upsert_upload(7, 120, now).unwrap();
        db.increment_questions(7, now).unwrap();
        db.increment_questions(7, now).unwrap();
        db.upsert_upload(7, 300, now + Duration::seconds(10)).unwrap();

        let stats = db.channel_stats(7).unwrap().unwrap();
        assert_eq!(stats.questions_answered, 2);
        assert_eq!(stats.data_size, 300);
        assert!(stats.created_at.is_some());
    }

    #[test]
    fn test_increment_creates_missing_row() {
        let db = Database::memory().unwrap();
        db.increment_questions(11, Utc::now()).unwrap();

        let stats = db.channel_stats(11).unwrap().unwrap();
        assert_eq!(stats.questions_answered, 1);
        assert_eq!(stats.data_size, 0);
    }

    #[test]
    fn test_question_aggregates() {
        let db = Database::memory().unwrap();
        let now = Utc::now();

        for (user, question) in [(1, "a"), (1, "b"), (2, "c"), (3, "d"), (1, "e")] {
            db.insert_question(5, user, question, "answer", now).unwrap();
        }
        db.insert_question(6, 9, "other channel", "answer", now).unwrap();

        let stats = db.question_stats(5).unwrap();
        assert_eq!(stats.total_questions, 5);
        assert_eq!(stats.unique_users, 3);

        let top = db.top_users(5, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], UserQuestionCount { user_id: 1, question_count: 3 });

        let recent = db.recent_questions(5, 1).unwrap();
        assert_eq!(recent[0].question, "e");
    }

    #[test]
    fn test_last_question_timestamp_roundtrip() {
        let db = Database::memory().unwrap();
        assert!(db.last_question_at(42).unwrap().is_none());

        let earlier = Utc::now() - Duration::minutes(3);
        let later = Utc::now();
        db.insert_question(1, 42, "first", "a", earlier).unwrap();
        db.insert_question(2, 42, "second", "b", later).unwrap();

        let last = db.last_question_at(42).unwrap().unwrap();
        assert_eq!(last.timestamp_millis(), later.timestamp_millis());
    }

    #[test]
    fn test_top_channels_order() {
        let db = Database::memory().unwrap();
        let now = Utc::now();
        db.upsert_upload(1, 10, now).unwrap();
        db.upsert_upload(2, 10, now).unwrap();
        db.increment_questions(2, now).unwrap();

        let top = db.top_channels(10).unwrap();
        assert_eq!(top.iter().map(|s| s.channel_id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_delete_and_purge() {
        let db = Database::memory().unwrap();
        let now = Utc::now();
        db.upsert_upload(3, 10, now).unwrap();
        db.insert_question(3, 1, "q", "a", now).unwrap();

        assert!(db.delete_channel_stats(3).unwrap());
        assert!(!db.delete_channel_stats(3).unwrap());
        assert_eq!(db.purge_history(3).unwrap(), 1);
        assert_eq!(db.question_stats(3).unwrap().total_questions, 0);
    }

    #[test]
    fn test_vacuum_into_copies_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::new(temp_dir.path().join("stats.db")).unwrap();
        db.upsert_upload(4, 99, Utc::now()).unwrap();

        let snapshot = temp_dir.path().join("snapshot.db");
        db.vacuum_into(&snapshot).unwrap();

        let copy = Database::new(&snapshot).unwrap();
        assert_eq!(copy.channel_stats(4).unwrap().unwrap().data_size, 99);
    }
}
