//! studyguide-rs CLI application
//!
//! Drives the bot's commands from a terminal, standing in for a chat
//! platform adapter.

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use studyguide_rs::{CommandContext, Config, Reply, StudyGuideBot, Upload};

#[derive(Parser)]
#[command(name = "studyguide-rs")]
#[command(about = "A per-channel knowledge base question-answering bot")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Channel the command runs in
    #[arg(long, global = true, default_value = "1")]
    channel: u64,

    /// User issuing the command
    #[arg(long, global = true, default_value = "1")]
    user: u64,

    /// Run with administrator permissions
    #[arg(long, global = true)]
    admin: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data, backup and log folders
    Setup,

    /// Upload a .txt knowledge base for the channel
    Upload {
        /// Text file to upload
        file: PathBuf,
    },

    /// Replace the channel's knowledge base
    Update {
        /// Text file to upload
        file: PathBuf,
    },

    /// Preview the channel's knowledge base
    View,

    /// Delete the channel's knowledge base
    Delete {
        /// Also remove the channel's question history
        #[arg(long)]
        purge_history: bool,
    },

    /// Show channel statistics
    Stats,

    /// Show overall bot status
    Status,

    /// Show the last answered question in the channel
    Debug,

    /// Ask a question against the channel's knowledge base
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Run one backup now
    Backup,

    /// Interactive session with slash commands and scheduled backups
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let bot = StudyGuideBot::from_config(config).context("Failed to start the bot")?;
    let ctx = CommandContext {
        channel_id: cli.channel,
        user_id: cli.user,
        is_admin: cli.admin,
    };

    match cli.command {
        Commands::Setup => print_reply(bot.setup(&ctx).await),
        Commands::Upload { file } => {
            let upload = read_upload(&file).await?;
            print_reply(bot.upload(&ctx, &upload).await);
        }
        Commands::Update { file } => {
            let upload = read_upload(&file).await?;
            print_reply(bot.update(&ctx, &upload).await);
        }
        Commands::View => print_reply(bot.view(&ctx).await),
        Commands::Delete { purge_history } => print_reply(bot.delete(&ctx, purge_history).await),
        Commands::Stats => print_reply(bot.stats(&ctx).await),
        Commands::Status => print_reply(bot.status(&ctx).await),
        Commands::Debug => print_reply(bot.debug(&ctx)),
        Commands::Ask { question } => {
            let reply = ask_with_spinner(&bot, &ctx, &question.join(" ")).await?;
            print_reply(reply);
        }
        Commands::Backup => {
            let report = bot.backup_job().run_once().await?;
            println!("💾 Backup written to {}", report.directory.display());
            println!("   📄 Files: {}", report.files_copied);
            println!("   📦 Size: {}", studyguide_rs::utils::format_file_size(report.bytes_copied));
        }
        Commands::Chat => chat_command(&bot, ctx).await?,
    }

    Ok(())
}

fn print_reply(reply: Reply) {
    if reply.ephemeral {
        println!("(only visible to you)");
    }
    println!("{}", reply);
}

async fn read_upload(path: &std::path::Path) -> anyhow::Result<Upload> {
    Upload::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn thinking_spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner} {msg}")?,
    );
    spinner.set_message("🤔 Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

async fn ask_with_spinner(bot: &StudyGuideBot, ctx: &CommandContext, question: &str) -> anyhow::Result<Reply> {
    let spinner = thinking_spinner()?;
    let reply = bot.ask(ctx, question).await;
    spinner.finish_and_clear();
    Ok(reply)
}

async fn chat_command(bot: &StudyGuideBot, ctx: CommandContext) -> anyhow::Result<()> {
    let backup = if bot.config().backup.enabled {
        Some(bot.backup_job().spawn(bot.config().backup.interval()))
    } else {
        None
    };

    println!("💬 Starting interactive session in channel {}...", ctx.channel_id);
    println!("   Type a question, a /command, or 'quit' to end the session");
    println!();

    loop {
        print!("❓ ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "exit" {
            println!("👋 Goodbye!");
            break;
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        let reply = match command {
            "/ask" => ask_with_spinner(bot, &ctx, rest).await?,
            "/help" => bot.help(),
            "/stats" => bot.stats(&ctx).await,
            "/setup" => bot.setup(&ctx).await,
            "/dataupload" | "/update" => match Upload::from_path(rest).await {
                Ok(upload) if command == "/update" => bot.update(&ctx, &upload).await,
                Ok(upload) => bot.upload(&ctx, &upload).await,
                Err(e) => Reply::private(format!("❌ Could not read '{}': {}", rest, e)),
            },
            "/dataview" => bot.view(&ctx).await,
            "/datadelete" => bot.delete(&ctx, rest == "--purge-history").await,
            "/status" => bot.status(&ctx).await,
            "/debug" => bot.debug(&ctx),
            other if other.starts_with('/') => Reply::private(format!("❌ Unknown command {}. Try /help", other)),
            _ => ask_with_spinner(bot, &ctx, input).await?,
        };

        print_reply(reply);
        println!();
    }

    if let Some(handle) = backup {
        handle.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["studyguide-rs", "ask", "when", "do", "you", "open?"]).unwrap();
        assert_eq!(cli.channel, 1);
        assert!(!cli.admin);
        assert!(matches!(cli.command, Commands::Ask { ref question } if question.len() == 4));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["studyguide-rs", "delete", "--purge-history", "--admin", "--channel", "42"])
            .unwrap();
        assert!(cli.admin);
        assert_eq!(cli.channel, 42);
        assert!(matches!(cli.command, Commands::Delete { purge_history: true }));
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(Cli::try_parse_from(["studyguide-rs", "ask"]).is_err());
    }
}
