use async_trait::async_trait;

use super::error::ArchiveResult;
use crate::models::Message;

/// Durable destination for messages that are about to be pruned.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait MessageArchiver: Send + Sync {
    /// Whether this message has already been archived.
    ///
    /// Message ids are only unique within a channel, so the check is scoped by
    /// channel.
    async fn is_archived(&self, channel_id: &str, message_id: i64) -> ArchiveResult<bool>;

    /// Archive a message. Once this returns `Ok` the copy is durable and
    /// [`MessageArchiver::is_archived`] reports true for it.
    async fn archive(&self, message: &Message) -> ArchiveResult<()>;
}
