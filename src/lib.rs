//! # studyguide-rs
//!
//! A chat-platform question-answering bot. Each channel owns a plain-text
//! knowledge base; members ask questions and receive answers generated by a
//! hosted chat-completion model from that channel's text, with per-user
//! rolling context, rate limiting, word filtering, statistics and daily
//! backups.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studyguide_rs::{CommandContext, Config, StudyGuideBot, Upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = StudyGuideBot::from_config(Config::load(None)?)?;
//!
//!     let admin = CommandContext::admin(42, 1);
//!     let upload = Upload::new("cafe.txt", b"The cafe opens at 9am.".to_vec());
//!     println!("{}", bot.upload(&admin, &upload).await);
//!
//!     let member = CommandContext::user(42, 7);
//!     println!("{}", bot.ask(&member, "When does the cafe open?").await);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod api;
pub mod backup;
pub mod config;
pub mod context;
pub mod debug;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod knowledge;
pub mod prompt;
pub mod rate_limit;
pub mod stats;
pub mod storage;
pub mod utils;

/// Chat platform channel identifier
pub type ChannelId = u64;

/// Chat platform user identifier
pub type UserId = u64;

// Re-export main API types
pub use api::{AskOutcome, CommandContext, QaOrchestrator, Reply, StudyGuideBot};
pub use config::Config;
pub use error::{Result, StudyGuideError};

// Re-export commonly used types
pub use backup::BackupJob;
pub use gateway::{CompletionGateway, OpenAiGateway};
pub use knowledge::{KnowledgeStore, Upload};
pub use stats::StatsRecorder;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_imports() {
        // Ensure all major types can be imported
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.completion.api_key.is_none());
    }
}
