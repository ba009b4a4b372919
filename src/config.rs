//! Configuration for studyguide-rs
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables (a `.env` file is honoured by the binary).

use crate::error::{Result, StudyGuideError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the completion service key
pub const ENV_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_DATA_DIR: &str = "STUDYGUIDE_DATA_DIR";
pub const ENV_MODEL: &str = "STUDYGUIDE_MODEL";
pub const ENV_API_BASE: &str = "STUDYGUIDE_API_BASE";
pub const ENV_MAX_UPLOAD_BYTES: &str = "STUDYGUIDE_MAX_UPLOAD_BYTES";
pub const ENV_COMMUNITY: &str = "STUDYGUIDE_COMMUNITY";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub assistant: AssistantConfig,
    pub backup: BackupConfig,
}

/// Where knowledge bases, statistics and backups live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<channel_id>.txt` files and the statistics database
    pub data_dir: PathBuf,

    /// File name of the SQLite statistics database inside `data_dir`
    pub stats_db_name: String,

    /// Directory for log files created by `setup`
    pub logs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            stats_db_name: "stats.db".to_string(),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl StorageConfig {
    pub fn stats_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.stats_db_name)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }
}

/// Fixed completion parameters; never adjusted per call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// API key, usually supplied through the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    pub api_base: String,

    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,

    /// Upper bound on a single completion call
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            top_p: 0.9,
            timeout_secs: 30,
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Behaviour of the question-answering pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Community name used in the prompt framing
    pub community_name: String,

    /// Upload size limit in bytes
    pub max_upload_bytes: u64,

    /// Minimum gap between two answered questions of one user
    pub rate_limit_ms: u64,

    /// Questions kept per user in the rolling context
    pub context_window: usize,

    /// Most recent context entries embedded in a prompt
    pub prompt_context: usize,

    /// Users tracked by the rolling context and rate-limit caches before LRU eviction
    pub context_capacity: usize,

    /// Channels tracked by the debug snapshot cache before LRU eviction
    pub debug_capacity: usize,

    /// Words masked out of generated answers
    pub disallowed_words: Vec<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            community_name: "Sunnie Study Cafe".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            rate_limit_ms: 5_000,
            context_window: 5,
            prompt_context: 3,
            context_capacity: 10_000,
            debug_capacity: 10_000,
            disallowed_words: ["fuck", "shit", "damn", "bitch", "ass", "hell", "crap"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

impl AssistantConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

/// Scheduled backup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    pub interval_hours: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 24,
        }
    }
}

impl BackupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }
}

impl Config {
    /// Load defaults, an optional JSON file, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file; missing sections keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StudyGuideError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Overlay environment values using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.completion.api_key = Some(key);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.completion.model = model;
        }
        if let Some(base) = lookup(ENV_API_BASE) {
            self.completion.api_base = base;
        }
        if let Some(name) = lookup(ENV_COMMUNITY) {
            self.assistant.community_name = name;
        }
        if let Some(raw) = lookup(ENV_MAX_UPLOAD_BYTES) {
            self.assistant.max_upload_bytes = raw.trim().parse().map_err(|_| {
                StudyGuideError::Config(format!("{} must be a byte count, got '{}'", ENV_MAX_UPLOAD_BYTES, raw))
            })?;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.assistant.max_upload_bytes == 0 {
            return Err(StudyGuideError::Config("max_upload_bytes must be greater than 0".to_string()));
        }
        if self.assistant.context_window == 0 {
            return Err(StudyGuideError::Config("context_window must be greater than 0".to_string()));
        }
        if self.assistant.context_capacity == 0 || self.assistant.debug_capacity == 0 {
            return Err(StudyGuideError::Config("cache capacities must be greater than 0".to_string()));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(StudyGuideError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.completion.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.completion.top_p) || self.completion.top_p == 0.0 {
            return Err(StudyGuideError::Config(format!(
                "top_p must be within (0.0, 1.0], got {}",
                self.completion.top_p
            )));
        }
        if self.completion.max_tokens == 0 || self.completion.timeout_secs == 0 {
            return Err(StudyGuideError::Config("max_tokens and timeout_secs must be greater than 0".to_string()));
        }
        if self.backup.enabled && self.backup.interval_hours == 0 {
            return Err(StudyGuideError::Config("backup interval must be at least one hour".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.completion.model, "llama3-8b-8192");
        assert_eq!(config.completion.max_tokens, 500);
        assert_eq!(config.assistant.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.assistant.rate_limit_window(), Duration::from_secs(5));
        assert_eq!(config.storage.stats_db_path(), PathBuf::from("data/stats.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "gsk_test"),
            (ENV_DATA_DIR, "/tmp/guide"),
            (ENV_MAX_UPLOAD_BYTES, "2048"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.completion.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/guide"));
        assert_eq!(config.assistant.max_upload_bytes, 2048);
    }

    #[test]
    fn test_env_overlay_rejects_bad_size() {
        let mut config = Config::default();
        let result = config.apply_env(|key| (key == ENV_MAX_UPLOAD_BYTES).then(|| "ten".to_string()));
        assert!(matches!(result, Err(StudyGuideError::Config(_))));
    }

    #[test]
    fn test_partial_json_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{ "assistant": { "community_name": "Night Owls" } }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.assistant.community_name, "Night Owls");
        assert_eq!(config.assistant.context_window, 5);
        assert_eq!(config.completion.top_p, 0.9);
    }

    #[test]
    fn test_validate_rejects_bad_sampling() {
        let mut config = Config::default();
        config.completion.top_p = 1.5;
        assert!(config.validate().is_err());
    }
}
