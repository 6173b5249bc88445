use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::{db::error::DbResult, models::Status};

/// Delete statements issued by the pruning cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PruneStatement {
    /// Delete stored content of eligible messages
    DeleteMessageContent,
    /// Delete custom metadata rows of eligible messages
    DeleteCustomMetadata,
    /// Delete attachments of eligible messages
    DeleteAttachments,
    /// Delete connector message rows of eligible messages
    DeleteConnectorMessages,
    /// Delete the eligible message rows themselves
    DeleteMessages,
}

impl PruneStatement {
    /// Statements that only exist on some schema versions.
    pub const OPTIONAL: [PruneStatement; 3] = [
        PruneStatement::DeleteCustomMetadata,
        PruneStatement::DeleteAttachments,
        PruneStatement::DeleteConnectorMessages,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PruneStatement::DeleteMessageContent => "delete_message_content",
            PruneStatement::DeleteCustomMetadata => "delete_custom_metadata",
            PruneStatement::DeleteAttachments => "delete_attachments",
            PruneStatement::DeleteConnectorMessages => "delete_connector_messages",
            PruneStatement::DeleteMessages => "delete_messages",
        }
    }
}

impl std::fmt::Display for PruneStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters shared by every statement of a pruning attempt.
///
/// A message is eligible when it belongs to the channel, was received before
/// `date_threshold`, is processed (if `skip_incomplete`), and none of its
/// connector messages has a status in `skip_statuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneParams {
    pub channel_storage_id: i64,
    pub date_threshold: DateTime<Utc>,
    pub skip_statuses: BTreeSet<Status>,
    pub skip_incomplete: bool,
}

impl PruneParams {
    /// Skip statuses packed into a string of status codes (e.g. `"QE"`).
    pub fn skip_status_codes(&self) -> String {
        self.skip_statuses.iter().map(Status::code).collect()
    }
}

/// A message row selected for archiving, before its connector messages are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCandidate {
    pub message_id: i64,
    pub received_date: DateTime<Utc>,
    pub processed: bool,
    pub server_id: String,
    pub import_id: Option<i64>,
}

/// One transactional unit of work against the message store.
///
/// Dropping a session without calling [`StoreSession::commit`] discards every
/// mutation made through it.
#[async_trait]
pub trait StoreSession: Send {
    /// Whether the store's schema supports `statement`.
    fn supports(&self, statement: PruneStatement) -> bool;

    /// Execute a delete statement, returning the number of affected rows.
    async fn delete(&mut self, statement: PruneStatement, params: &PruneParams) -> DbResult<u64>;

    /// Stream the messages eligible under `params`, oldest first.
    ///
    /// The stream is lazy and can only be consumed once.
    fn archive_candidates<'a>(
        &'a mut self,
        params: &'a PruneParams,
    ) -> BoxStream<'a, DbResult<ArchiveCandidate>>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Source of pruning sessions.
///
/// Every call returns an independent session, so concurrent pruners for
/// different channels never share transactional state.
#[async_trait]
pub trait PruneStore: Send + Sync {
    async fn begin(&self) -> DbResult<Box<dyn StoreSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_names() {
        assert_eq!(PruneStatement::DeleteMessages.to_string(), "delete_messages");
        assert!(!PruneStatement::OPTIONAL.contains(&PruneStatement::DeleteMessageContent));
        assert!(!PruneStatement::OPTIONAL.contains(&PruneStatement::DeleteMessages));
    }

    #[test]
    fn test_skip_status_codes() {
        let params = PruneParams {
            channel_storage_id: 3,
            date_threshold: Utc::now(),
            skip_statuses: BTreeSet::from([Status::Queued, Status::Error]),
            skip_incomplete: false,
        };
        // BTreeSet iterates in declaration order
        assert_eq!(params.skip_status_codes(), "QE");

        let none = PruneParams {
            skip_statuses: BTreeSet::new(),
            ..params
        };
        assert_eq!(none.skip_status_codes(), "");
    }
}
