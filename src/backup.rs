//! Scheduled backups
//!
//! Copies every channel file plus a snapshot of the statistics database into
//! `<backups_dir>/<YYYYMMDD>/`. Copies run alongside request handling without
//! taking any lock over the knowledge-base files; a file written mid-copy
//! may land in either version.

use crate::error::Result;
use crate::stats::StatsRecorder;
use chrono::Utc;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What a backup run produced
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub directory: PathBuf,
    pub files_copied: usize,
    pub bytes_copied: u64,
}

/// Periodic copy of knowledge bases and statistics
#[derive(Clone)]
pub struct BackupJob {
    data_dir: PathBuf,
    backups_dir: PathBuf,
    stats: Arc<StatsRecorder>,
}

impl BackupJob {
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(data_dir: P1, backups_dir: P2, stats: Arc<StatsRecorder>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            backups_dir: backups_dir.as_ref().to_path_buf(),
            stats,
        }
    }

    /// Run one backup into today's folder
    pub async fn run_once(&self) -> Result<BackupReport> {
        let directory = self
            .backups_dir
            .join(crate::utils::backup_folder_name(Utc::now()));
        tokio::fs::create_dir_all(&directory).await?;

        let mut sources = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && crate::utils::is_text_file(&path) {
                sources.push(path);
            }
        }

        let copies = sources.iter().map(|src| {
            let dst = directory.join(src.file_name().unwrap_or_default());
            async move { tokio::fs::copy(src, dst).await }
        });
        let sizes = try_join_all(copies).await?;

        self.stats.snapshot_to(directory.join("stats.db")).await?;

        let report = BackupReport {
            directory,
            files_copied: sizes.len(),
            bytes_copied: sizes.iter().sum(),
        };
        log::info!(
            "💾 Daily backup completed: {} ({} files, {})",
            report.directory.display(),
            report.files_copied,
            crate::utils::format_file_size(report.bytes_copied)
        );
        Ok(report)
    }

    /// Run now, then every `interval`; failures are logged and retried on the
    /// next tick
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    log::error!("❌ Daily backup failed: {}", e);
                }
            }
        })
    }
}
