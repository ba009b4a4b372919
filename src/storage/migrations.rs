//! Database migrations and compatibility

use crate::error::{Result, StudyGuideError};
use crate::storage::schema::*;
use rusqlite::{Connection, OptionalExtension};

/// Migrations in the order they must be applied
const MIGRATIONS: &[(&str, &str)] = &[
    ("initial_schema", "Create channel_stats and question_history"),
    ("add_history_indexes", "Index question_history by channel and user"),
];

/// Database migration manager
pub struct MigrationManager<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Run all pending migrations
    pub fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(CREATE_MIGRATIONS_TABLE)
            .map_err(|e| StudyGuideError::Storage(format!("Failed to create migrations table: {}", e)))?;

        let applied = self.applied_versions()?;

        for (version, description) in MIGRATIONS {
            if applied.iter().any(|v| v.as_str() == *version) {
                continue;
            }

            log::info!("Applying migration: {} - {}", version, description);
            self.apply_migration(version)?;

            self.conn
                .execute("INSERT INTO migrations (version) VALUES (?)", [version])
                .map_err(|e| StudyGuideError::Storage(format!("Failed to record migration {}: {}", version, e)))?;
        }

        Ok(())
    }

    fn applied_versions(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT version FROM migrations ORDER BY id")
            .map_err(|e| StudyGuideError::Storage(format!("Failed to prepare migration query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StudyGuideError::Storage(format!("Failed to execute migration query: {}", e)))?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(
                row.map_err(|e| StudyGuideError::Storage(format!("Failed to read migration version: {}", e)))?,
            );
        }
        Ok(versions)
    }

    /// Apply a specific migration
    fn apply_migration(&self, version: &str) -> Result<()> {
        match version {
            "initial_schema" => {
                self.conn
                    .execute_batch(CREATE_CHANNEL_STATS_TABLE)
                    .map_err(|e| StudyGuideError::Storage(format!("Failed to create channel_stats table: {}", e)))?;
                self.conn
                    .execute_batch(CREATE_QUESTION_HISTORY_TABLE)
                    .map_err(|e| StudyGuideError::Storage(format!("Failed to create question_history table: {}", e)))?;
                Ok(())
            }
            "add_history_indexes" => {
                self.conn
                    .execute_batch(CREATE_HISTORY_INDEXES)
                    .map_err(|e| StudyGuideError::Storage(format!("Failed to create indexes: {}", e)))?;
                Ok(())
            }
            _ => Err(StudyGuideError::Storage(format!("Unknown migration version: {}", version))),
        }
    }

    /// Get current database version
    pub fn current_version(&self) -> Result<Option<String>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM migrations ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| StudyGuideError::Storage(format!("Failed to query current version: {}", e)))?;

        Ok(version)
    }

    /// Check if every migration up to `SCHEMA_VERSION` has been applied
    pub fn is_up_to_date(&self) -> Result<bool> {
        Ok(self.applied_versions()?.len() >= SCHEMA_VERSION as usize)
    }
}
