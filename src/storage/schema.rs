//! Database schema definitions

/// Database schema version
pub const SCHEMA_VERSION: u32 = 2;

/// SQL for creating the migrations bookkeeping table
pub const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version TEXT NOT NULL UNIQUE,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQL for creating the per-channel aggregate table
pub const CREATE_CHANNEL_STATS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS channel_stats (
    channel_id INTEGER PRIMARY KEY,
    questions_answered INTEGER DEFAULT 0,
    data_size INTEGER DEFAULT 0,
    last_updated TIMESTAMP,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQL for creating the append-only question log
pub const CREATE_QUESTION_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS question_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    channel_id INTEGER,
    user_id INTEGER,
    question TEXT,
    answer TEXT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQL for the indexes backing per-channel aggregates and rate-limit lookups
pub const CREATE_HISTORY_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_history_channel ON question_history(channel_id);
CREATE INDEX IF NOT EXISTS idx_history_user ON question_history(user_id, id);
"#;
