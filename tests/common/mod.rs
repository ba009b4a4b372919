//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studyguide_rs::error::{Result, StudyGuideError};
use studyguide_rs::{CompletionGateway, Config, StudyGuideBot};
use tempfile::TempDir;

/// Completion gateway that replays a fixed reply and records payloads
pub struct ScriptedGateway {
    reply: Option<String>,
    delay: Option<Duration>,
    payloads: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            delay: None,
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            delay: None,
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn stalling(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Some("too late".to_string()),
            delay: Some(delay),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(&self, payload: &str) -> Result<String> {
        self.payloads.lock().unwrap().push(payload.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply
            .clone()
            .ok_or_else(|| StudyGuideError::Gateway("503 service unavailable".to_string()))
    }

    fn description(&self) -> String {
        "scripted".to_string()
    }
}

/// Configuration rooted in a temporary directory
pub fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = temp_dir.path().join("data");
    config.storage.logs_dir = temp_dir.path().join("logs");
    config
}

pub fn bot_with(config: Config, gateway: Arc<ScriptedGateway>) -> StudyGuideBot {
    StudyGuideBot::new(config, gateway).unwrap()
}

pub fn bot(temp_dir: &TempDir, gateway: Arc<ScriptedGateway>) -> StudyGuideBot {
    bot_with(test_config(temp_dir), gateway)
}

/// Drop a statistics table behind the bot's back through a second connection
pub fn drop_stats_table(temp_dir: &TempDir, table: &str) {
    let path = test_config(temp_dir).storage.stats_db_path();
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(&format!("DROP TABLE {}", table)).unwrap();
}
