use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{db::error::DbResult, models::ConnectorMessage};

/// Targeted lookup of the connector messages belonging to one message.
///
/// Runs outside any pruning session, on its own connection.
#[async_trait]
pub trait ConnectorMessageLookup: Send + Sync {
    /// Fetch every connector message of `message_id`, keyed by metadata id.
    async fn connector_messages(
        &self,
        channel_id: &str,
        message_id: i64,
    ) -> DbResult<BTreeMap<i32, ConnectorMessage>>;
}
