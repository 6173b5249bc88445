use async_trait::async_trait;

use crate::db::error::DbResult;

/// Maps a public channel identifier to the identifier its rows are stored under.
#[async_trait]
pub trait ChannelIdResolver: Send + Sync {
    /// Resolve the storage id for a channel.
    ///
    /// Returns `DbError::NotFound` when the channel has never been deployed.
    async fn storage_id(&self, channel_id: &str) -> DbResult<i64>;
}
