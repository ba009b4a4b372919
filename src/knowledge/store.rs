//! Per-channel knowledge-base files
//!
//! Each channel owns one UTF-8 text file, `<data_dir>/<channel_id>.txt`.
//! Writes are last-writer-wins.

use crate::error::{Result, StudyGuideError};
use crate::knowledge::KnowledgeBase;
use crate::stats::StatsRecorder;
use crate::ChannelId;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Maps a channel to its knowledge-base text
pub struct KnowledgeStore {
    data_dir: PathBuf,
    stats: Arc<StatsRecorder>,
}

impl KnowledgeStore {
    pub fn new<P: AsRef<Path>>(data_dir: P, stats: Arc<StatsRecorder>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        crate::utils::ensure_directory(&data_dir)?;
        Ok(Self { data_dir, stats })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn channel_path(&self, channel_id: ChannelId) -> PathBuf {
        self.data_dir.join(format!("{}.txt", channel_id))
    }

    /// Stored text with surrounding whitespace trimmed; `None` when the
    /// channel has no knowledge base or the file cannot be read
    pub async fn get(&self, channel_id: ChannelId) -> Option<String> {
        match self.info(channel_id).await {
            Ok(found) => found.map(|kb| kb.text),
            Err(e) => {
                log::error!("Error reading channel data for {}: {}", channel_id, e);
                None
            }
        }
    }

    /// Stored text plus size and modification time
    pub async fn info(&self, channel_id: ChannelId) -> Result<Option<KnowledgeBase>> {
        let path = self.channel_path(channel_id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let metadata = tokio::fs::metadata(&path).await?;
        let last_updated = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(KnowledgeBase {
            channel_id,
            text: content.trim().to_string(),
            size_bytes: metadata.len(),
            last_updated,
        }))
    }

    /// Overwrite the channel's knowledge base and refresh its stats row.
    ///
    /// The text is staged in `<channel_id>.txt.tmp` and only renamed over the
    /// live file once the stats row is written, so a failed save leaves the
    /// previous knowledge base in place.
    pub async fn save(&self, channel_id: ChannelId, text: &str) -> Result<KnowledgeBase> {
        let path = self.channel_path(channel_id);
        let staged = path.with_extension("txt.tmp");
        tokio::fs::write(&staged, text).await.map_err(|e| {
            StudyGuideError::Storage(format!("Failed to write {}: {}", staged.display(), e))
        })?;

        let size_bytes = text.len() as u64;
        if let Err(e) = self.commit(channel_id, size_bytes, &staged, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                log::warn!("Could not remove {}: {}", staged.display(), cleanup);
            }
            return Err(e);
        }

        log::info!("📚 Saved knowledge base for channel {} ({} bytes)", channel_id, size_bytes);
        Ok(KnowledgeBase {
            channel_id,
            text: text.to_string(),
            size_bytes,
            last_updated: Utc::now(),
        })
    }

    async fn commit(&self, channel_id: ChannelId, size_bytes: u64, staged: &Path, path: &Path) -> Result<()> {
        self.stats.record_upload(channel_id, size_bytes).await?;
        tokio::fs::rename(staged, path).await.map_err(|e| {
            StudyGuideError::Storage(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    /// Remove the channel's stats row, then its file
    pub async fn delete(&self, channel_id: ChannelId) -> Result<DeleteOutcome> {
        let path = self.channel_path(channel_id);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(DeleteOutcome::NotFound);
        }

        self.stats.delete_channel(channel_id).await?;
        tokio::fs::remove_file(&path).await.map_err(|e| {
            StudyGuideError::Storage(format!("Failed to remove {}: {}", path.display(), e))
        })?;

        log::info!("🗑️ Deleted knowledge base for channel {}", channel_id);
        Ok(DeleteOutcome::Deleted)
    }

    /// Channels that have a knowledge base, with file sizes in bytes
    pub async fn list(&self) -> Result<Vec<(ChannelId, u64)>> {
        let mut entries = tokio::fs::read_dir(&self.data_dir).await?;
        let mut channels = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !crate::utils::is_text_file(&path) {
                continue;
            }
            let Some(channel_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<ChannelId>().ok())
            else {
                continue;
            };
            let size = entry.metadata().await?.len();
            channels.push((channel_id, size));
        }

        channels.sort_unstable();
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Store over an on-disk statistics database that a second connection
    /// can tamper with
    fn store_on_disk() -> (KnowledgeStore, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(StatsRecorder::open(temp_dir.path().join("stats.db")).unwrap());
        let store = KnowledgeStore::new(temp_dir.path(), stats).unwrap();
        (store, temp_dir)
    }

    fn drop_table(temp_dir: &TempDir, table: &str) {
        let conn = rusqlite::Connection::open(temp_dir.path().join("stats.db")).unwrap();
        conn.execute_batch(&format!("DROP TABLE {}", table)).unwrap();
    }

    fn store() -> (KnowledgeStore, Arc<StatsRecorder>, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let stats = Arc::new(StatsRecorder::memory().unwrap());
        let store = KnowledgeStore::new(temp_dir.path(), Arc::clone(&stats)).unwrap();
        (store, stats, temp_dir)
    }

    #[tokio::test]
    async fn test_save_then_get_trims() {
        let (store, stats, _temp_dir) = store();
        store.save(1, "  abc\n").await.unwrap();

        assert_eq!(store.get(1).await.as_deref(), Some("abc"));
        assert_eq!(stats.channel_stats(1).await.unwrap().unwrap().data_size, 6);
    }

    #[tokio::test]
    async fn test_missing_channel() {
        let (store, _stats, _temp_dir) = store();
        assert!(store.get(404).await.is_none());
        assert!(store.info(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_single_base() {
        let (store, _stats, _temp_dir) = store();
        store.save(2, "old").await.unwrap();
        store.save(2, "new").await.unwrap();

        assert_eq!(store.get(2).await.as_deref(), Some("new"));
        assert_eq!(store.list().await.unwrap(), vec![(2, 3)]);
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_stats_alone() {
        let (store, stats, _temp_dir) = store();
        stats.record_upload(5, 10).await.unwrap();

        assert_eq!(store.delete(5).await.unwrap(), DeleteOutcome::NotFound);
        assert!(stats.channel_stats(5).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_stats() {
        let (store, stats, _temp_dir) = store();
        store.save(6, "text").await.unwrap();

        assert_eq!(store.delete(6).await.unwrap(), DeleteOutcome::Deleted);
        assert!(store.get(6).await.is_none());
        assert!(stats.channel_stats(6).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let (store, _stats, temp_dir) = store();
        store.save(9, "nine").await.unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(temp_dir.path().join("10.md"), "x").unwrap();

        assert_eq!(store.list().await.unwrap(), vec![(9, 4)]);
    }

    #[tokio::test]
    async fn test_failed_stats_write_keeps_previous_text() {
        let (store, temp_dir) = store_on_disk();
        store.save(42, "secret v1").await.unwrap();
        drop_table(&temp_dir, "channel_stats");

        assert!(store.save(42, "secret v2").await.is_err());
        assert_eq!(store.get(42).await.as_deref(), Some("secret v1"));
        assert!(!temp_dir.path().join("42.txt.tmp").exists());
        assert_eq!(store.list().await.unwrap(), vec![(42, 9)]);
    }

    #[tokio::test]
    async fn test_failed_first_save_leaves_no_base() {
        let (store, temp_dir) = store_on_disk();
        drop_table(&temp_dir, "channel_stats");

        assert!(store.save(7, "draft").await.is_err());
        assert!(store.get(7).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_stats_delete_keeps_file() {
        let (store, temp_dir) = store_on_disk();
        store.save(42, "keep me").await.unwrap();
        drop_table(&temp_dir, "channel_stats");

        assert!(store.delete(42).await.is_err());
        assert_eq!(store.get(42).await.as_deref(), Some("keep me"));
    }
}
