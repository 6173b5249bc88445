use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{
    error::{ArchiveError, ArchiveResult},
    traits::MessageArchiver,
};
use crate::models::Message;

/// File-based archiver.
///
/// Stores each message as a pretty-printed JSON document at
/// `<root>/<channel_id>/<message_id>.json`. Documents are written to a
/// temporary file first and renamed into place, so an archive file either
/// exists complete or not at all.
pub struct FileArchiver {
    root: PathBuf,
}

impl FileArchiver {
    /// Create a file archiver rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> ArchiveResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        tracing::info!(path = ?root, "Using file message archive");

        Ok(Self { root })
    }

    fn channel_dir(&self, channel_id: &str) -> ArchiveResult<PathBuf> {
        let valid = !channel_id.is_empty()
            && channel_id != "."
            && channel_id != ".."
            && !channel_id.contains(['/', '\\']);
        if !valid {
            return Err(ArchiveError::Internal(format!(
                "Channel id cannot be used as an archive directory: {:?}",
                channel_id
            )));
        }
        Ok(self.root.join(channel_id))
    }

    /// Get the file path for an archived message.
    pub fn message_path(&self, channel_id: &str, message_id: i64) -> ArchiveResult<PathBuf> {
        Ok(self
            .channel_dir(channel_id)?
            .join(format!("{}.json", message_id)))
    }
}

/// Write `contents` to a new file at `path` and flush it to disk.
async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}

/// Flush a directory entry change (the rename) to disk.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl MessageArchiver for FileArchiver {
    async fn is_archived(&self, channel_id: &str, message_id: i64) -> ArchiveResult<bool> {
        let path = self.message_path(channel_id, message_id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn archive(&self, message: &Message) -> ArchiveResult<()> {
        let dir = self.channel_dir(&message.channel_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let json = serde_json::to_string_pretty(message)
            .map_err(|e| ArchiveError::Serialization(e.to_string()))?;

        let path = dir.join(format!("{}.json", message.message_id));
        let tmp = dir.join(format!(".{}.{}.tmp", message.message_id, Uuid::new_v4()));

        if let Err(e) = write_synced(&tmp, json.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &path).await?;
        sync_dir(&dir).await?;

        tracing::trace!(
            channel_id = %message.channel_id,
            message_id = message.message_id,
            path = ?path,
            "Archived message"
        );

        Ok(())
    }
}
