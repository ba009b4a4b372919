//! StudyGuideBot - the command surface
//!
//! Every chat command maps to one method returning a [`Reply`]. The chat
//! platform adapter supplies a [`CommandContext`] (who asked, where, and
//! whether they hold an administrator-equivalent permission) and delivers
//! the reply text. Failures are rendered as one emoji-prefixed line; details
//! go to the log.

use crate::api::orchestrator::{AskOutcome, OrchestratorDeps, QaOrchestrator};
use crate::backup::BackupJob;
use crate::config::Config;
use crate::context::UserContextTracker;
use crate::debug::DebugSnapshots;
use crate::error::{Result, StudyGuideError};
use crate::filter::ResponseFilter;
use crate::gateway::{CompletionGateway, OpenAiGateway};
use crate::knowledge::{self, DeleteOutcome, KnowledgeStore, Upload};
use crate::prompt::PromptBuilder;
use crate::rate_limit::RateLimiter;
use crate::stats::StatsRecorder;
use crate::utils::{format_count, format_file_size, format_timestamp, line_count, truncate_chars};
use crate::{ChannelId, UserId};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

const ADMIN_REQUIRED: &str = "❌ You need administrator permissions to use this command.";
const VIEW_PREVIEW_CHARS: usize = 1500;
const DEBUG_PREVIEW_CHARS: usize = 500;
const STATS_TOP_USERS: usize = 5;
const STATUS_TOP_CHANNELS: usize = 10;

/// Who issued a command and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    pub channel_id: ChannelId,
    pub user_id: UserId,

    /// Administrator or manage-server permission, as reported by the platform
    pub is_admin: bool,
}

impl CommandContext {
    pub fn user(channel_id: ChannelId, user_id: UserId) -> Self {
        Self {
            channel_id,
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(channel_id: ChannelId, user_id: UserId) -> Self {
        Self {
            channel_id,
            user_id,
            is_admin: true,
        }
    }
}

/// Text to post back; `ephemeral` replies are shown to the caller only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: false,
        }
    }

    pub fn private(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The assembled bot: configuration plus every component behind the commands
pub struct StudyGuideBot {
    config: Config,
    orchestrator: QaOrchestrator,
    knowledge: Arc<KnowledgeStore>,
    stats: Arc<StatsRecorder>,
    debug: Arc<DebugSnapshots>,
}

impl StudyGuideBot {
    /// Build with the OpenAI-compatible gateway described by `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let gateway = Arc::new(OpenAiGateway::new(config.completion.clone())?);
        Self::new(config, gateway)
    }

    /// Build with a caller-supplied gateway, opening the statistics database
    /// from `config`
    pub fn new(config: Config, gateway: Arc<dyn CompletionGateway>) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(StatsRecorder::open(config.storage.stats_db_path())?);
        Self::with_stats(config, gateway, stats)
    }

    pub fn with_stats(config: Config, gateway: Arc<dyn CompletionGateway>, stats: Arc<StatsRecorder>) -> Result<Self> {
        let knowledge = Arc::new(KnowledgeStore::new(&config.storage.data_dir, Arc::clone(&stats))?);
        let debug = Arc::new(DebugSnapshots::new(non_zero(config.assistant.debug_capacity)));

        let deps = OrchestratorDeps {
            knowledge: Arc::clone(&knowledge),
            stats: Arc::clone(&stats),
            rate_limiter: Arc::new(RateLimiter::new(
                config.assistant.rate_limit_window(),
                non_zero(config.assistant.context_capacity),
                Arc::clone(&stats),
            )),
            gateway: Arc::clone(&gateway),
            context: Arc::new(UserContextTracker::new(
                config.assistant.context_window,
                non_zero(config.assistant.context_capacity),
            )),
            debug: Arc::clone(&debug),
        };

        let orchestrator = QaOrchestrator::new(
            deps,
            PromptBuilder::new(config.assistant.community_name.clone(), config.assistant.prompt_context),
            ResponseFilter::new(&config.assistant.disallowed_words),
            config.completion.timeout(),
        );

        log::info!("🤖 Study guide bot ready (gateway: {})", gateway.description());
        Ok(Self {
            config,
            orchestrator,
            knowledge,
            stats,
            debug,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &QaOrchestrator {
        &self.orchestrator
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn stats_recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    /// Backup job over this bot's data directory and statistics
    pub fn backup_job(&self) -> BackupJob {
        BackupJob::new(
            &self.config.storage.data_dir,
            self.config.storage.backups_dir(),
            Arc::clone(&self.stats),
        )
    }

    // ----- user commands -------------------------------------------------

    /// `/ask <question>`
    pub async fn ask(&self, ctx: &CommandContext, question: &str) -> Reply {
        let question = question.trim();
        if question.is_empty() {
            return Reply::private("❌ Please include a question.");
        }

        match self.orchestrator.ask(ctx.channel_id, ctx.user_id, question).await {
            AskOutcome::NoKnowledgeBase => Reply::public(
                "❌ No Knowledge Base\n\
                 This channel doesn't have a knowledge base yet!\n\
                 Ask an admin to upload data using `/dataupload`.",
            ),
            AskOutcome::RateLimited => Reply::private(StudyGuideError::RateLimited.user_message()),
            AskOutcome::Answered(answer) | AskOutcome::Fallback(answer) => {
                Reply::public(format!("💡 Answer\n{}", answer))
            }
        }
    }

    /// `/help`
    pub fn help(&self) -> Reply {
        Reply::public(format!(
            "📚 Study Guide Bot Help\n\
             Welcome to the {} guide bot!\n\
             \n\
             👤 User Commands\n\
             • `/ask <question>` - Ask a question based on this channel's knowledge base\n\
             • `/help` - Show this help message\n\
             • `/stats` - View channel statistics\n\
             \n\
             🛠️ Admin Commands\n\
             • `/setup` - Initialize bot\n\
             • `/dataupload <file>` - Upload knowledge base\n\
             • `/dataview` - View current data\n\
             • `/datadelete` - Delete channel data\n\
             • `/status` - Show bot status\n\
             • `/update <file>` - Update knowledge base\n\
             • `/debug` - Show debug info\n\
             \n\
             💡 Tips\n\
             • Each channel has its own knowledge base\n\
             • Ask specific questions for better answers\n\
             • The bot remembers your recent questions for context\n\
             • Admins can upload .txt files as knowledge bases",
            self.config.assistant.community_name
        ))
    }

    /// `/stats`
    pub async fn stats(&self, ctx: &CommandContext) -> Reply {
        match self.render_stats(ctx.channel_id).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Stats error: {}", e);
                Reply::public("❌ Error getting statistics. Please try again later.")
            }
        }
    }

    async fn render_stats(&self, channel_id: ChannelId) -> Result<Reply> {
        let Some(row) = self.stats.channel_stats(channel_id).await? else {
            return Ok(Reply::public(
                "📊 Channel Statistics\nNo statistics available for this channel yet.",
            ));
        };

        let totals = self.stats.question_stats_for_channel(channel_id).await?;
        let top_users = self.stats.top_users(channel_id, STATS_TOP_USERS).await?;

        let mut text = format!("📊 Channel Statistics\nStatistics for channel {}\n\n📈 Overview\n", channel_id);
        if row.data_size > 0 {
            text.push_str(&format!(
                "• Total questions: {}\n• Unique users: {}\n• Data size: {}\n",
                format_count(totals.total_questions),
                format_count(totals.unique_users),
                format_file_size(row.data_size)
            ));
        } else {
            text.push_str("No data uploaded\n");
        }

        if let Some(last_updated) = row.last_updated {
            text.push_str(&format!("\n⏰ Last Activity\nData updated: {}\n", format_timestamp(last_updated)));
        }

        if !top_users.is_empty() {
            text.push_str("\n🏆 Top Users\n");
            for user in &top_users {
                text.push_str(&format!("• User {}: {} questions\n", user.user_id, user.question_count));
            }
        }

        Ok(Reply::public(text.trim_end()))
    }

    // ----- admin commands ------------------------------------------------

    /// `/setup`
    pub async fn setup(&self, ctx: &CommandContext) -> Reply {
        if !ctx.is_admin {
            return Reply::private(ADMIN_REQUIRED);
        }

        let storage = &self.config.storage;
        let dirs = [storage.data_dir.clone(), storage.backups_dir(), storage.logs_dir.clone()];
        for dir in &dirs {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                log::error!("Setup failed creating {}: {}", dir.display(), e);
                return Reply::public("❌ Setup failed. Please check the bot's storage permissions.");
            }
        }

        log::info!("Setup completed by user {}", ctx.user_id);
        Reply::public(format!(
            "✅ Setup Complete\n\
             Bot has been successfully initialized!\n\
             \n\
             Folders Created\n{}\n\
             \n\
             Database\nSQLite database initialized",
            dirs.iter()
                .map(|d| format!("• {}/", d.display()))
                .collect::<Vec<_>>()
                .join("\n")
        ))
    }

    /// `/dataupload <file>`
    pub async fn upload(&self, ctx: &CommandContext, upload: &Upload) -> Reply {
        self.store_upload(ctx, upload, "✅ Knowledge Base Updated").await
    }

    /// `/update <file>`: same as upload, replacing any existing base
    pub async fn update(&self, ctx: &CommandContext, upload: &Upload) -> Reply {
        self.store_upload(ctx, upload, "🔄 Knowledge Base Replaced").await
    }

    async fn store_upload(&self, ctx: &CommandContext, upload: &Upload, title: &str) -> Reply {
        if !ctx.is_admin {
            return Reply::private(ADMIN_REQUIRED);
        }

        let text = match knowledge::validate_upload(upload, self.config.assistant.max_upload_bytes) {
            Ok(text) => text,
            Err(e) => {
                log::info!("Rejected upload '{}' in channel {}: {}", upload.filename, ctx.channel_id, e);
                return Reply::public(e.user_message());
            }
        };

        if let Err(e) = self.knowledge.save(ctx.channel_id, &text).await {
            log::error!("Data upload error: {}", e);
            return Reply::public("❌ Failed to save the file. Please try again.");
        }

        log::info!("Data uploaded for channel {} by user {}", ctx.channel_id, ctx.user_id);
        Reply::public(format!(
            "{}\n\
             Successfully uploaded data for channel {}\n\
             File Size: {} characters\n\
             Lines: {}\n\
             \n\
             Summary\n{}",
            title,
            ctx.channel_id,
            format_count(text.chars().count() as u64),
            format_count(line_count(&text) as u64),
            knowledge::summarize(&text)
        ))
    }

    /// `/dataview`
    pub async fn view(&self, ctx: &CommandContext) -> Reply {
        if !ctx.is_admin {
            return Reply::private(ADMIN_REQUIRED);
        }

        match self.knowledge.info(ctx.channel_id).await {
            Ok(Some(kb)) => Reply::public(format!(
                "📄 Channel Knowledge Base\n\
                 Data for channel {}\n\
                 Size: {} characters\n\
                 Lines: {}\n\
                 Last updated: {}\n\
                 \n\
                 Preview\n```\n{}\n```",
                ctx.channel_id,
                format_count(kb.text.chars().count() as u64),
                format_count(line_count(&kb.text) as u64),
                format_timestamp(kb.last_updated),
                truncate_chars(&kb.text, VIEW_PREVIEW_CHARS)
            )),
            Ok(None) => Reply::public("❌ No data found for this channel. Use `/dataupload` to add some!"),
            Err(e) => {
                log::error!("Data view error: {}", e);
                Reply::public("❌ Error viewing data. Please try again later.")
            }
        }
    }

    /// `/datadelete`; `purge_history` also removes the channel's question log
    pub async fn delete(&self, ctx: &CommandContext, purge_history: bool) -> Reply {
        if !ctx.is_admin {
            return Reply::private(ADMIN_REQUIRED);
        }

        match self.knowledge.delete(ctx.channel_id).await {
            Ok(DeleteOutcome::NotFound) => Reply::public("❌ No data found for this channel."),
            Ok(DeleteOutcome::Deleted) => {
                let mut text = format!(
                    "🗑️ Data Deleted\nKnowledge base for channel {} has been deleted.",
                    ctx.channel_id
                );
                if purge_history {
                    match self.stats.purge_history(ctx.channel_id).await {
                        Ok(removed) => text.push_str(&format!("\nRemoved {} history entries.", removed)),
                        Err(e) => {
                            log::error!("History purge error: {}", e);
                            text.push_str("\n❌ Question history could not be removed.");
                        }
                    }
                }
                log::info!("Data deleted for channel {} by user {}", ctx.channel_id, ctx.user_id);
                Reply::public(text)
            }
            Err(e) => {
                log::error!("Data delete error: {}", e);
                Reply::public("❌ Error deleting data. Please try again later.")
            }
        }
    }

    /// `/status`
    pub async fn status(&self, ctx: &CommandContext) -> Reply {
        if !ctx.is_admin {
            return Reply::private(ADMIN_REQUIRED);
        }

        match self.render_status().await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Status error: {}", e);
                Reply::public("❌ Error getting status. Please try again later.")
            }
        }
    }

    async fn render_status(&self) -> Result<Reply> {
        let channels = self.knowledge.list().await?;
        let total_size: u64 = channels.iter().map(|(_, size)| size).sum();
        let top = self.stats.top_channels(STATUS_TOP_CHANNELS).await?;

        let mut text = format!(
            "📊 Bot Status\n\
             Current bot status and statistics\n\
             \n\
             Storage\n\
             • Channels with data: {}\n\
             • Total data size: {} bytes\n\
             • Debug snapshots held: {}\n",
            channels.len(),
            format_count(total_size),
            self.debug.len()
        );

        text.push_str("\nTop Channels\n");
        if top.is_empty() {
            text.push_str("No data yet");
        } else {
            let lines: Vec<String> = top
                .iter()
                .map(|row| format!("• #{}: {} questions", row.channel_id, row.questions_answered))
                .collect();
            text.push_str(&lines.join("\n"));
        }

        Ok(Reply::public(text))
    }

    /// `/debug`
    pub fn debug(&self, ctx: &CommandContext) -> Reply {
        if !ctx.is_admin {
            return Reply::private(ADMIN_REQUIRED);
        }

        let Some(snapshot) = self.debug.get(ctx.channel_id) else {
            return Reply::public("❌ No debug information available for this channel.");
        };

        Reply::public(format!(
            "🐛 Debug Information\n\
             Last AI interaction for channel {}\n\
             \n\
             Question\n{}\n\
             \n\
             Answer\n{}\n\
             \n\
             Timestamp: {}\n\
             User: {}",
            ctx.channel_id,
            truncate_chars(&snapshot.question, DEBUG_PREVIEW_CHARS),
            truncate_chars(&snapshot.answer, DEBUG_PREVIEW_CHARS),
            format_timestamp(snapshot.timestamp),
            snapshot.user_id
        ))
    }
}

fn non_zero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}
