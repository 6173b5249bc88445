//! Archival pass that runs ahead of the deletion cascade.

use futures::TryStreamExt;

use super::error::AttemptError;
use crate::{
    archive::MessageArchiver,
    db::{ArchiveCandidate, ConnectorMessageLookup, PruneParams, StoreSession},
    models::Message,
};

/// Counts from one archival pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOutcome {
    /// Candidate rows read from the store.
    pub candidates: u64,
    /// Messages handed to the archiver.
    pub archived: u64,
    /// Candidates the archiver already held.
    pub already_archived: u64,
}

/// Streams eligible messages and hands each one not yet archived to the archiver.
///
/// Candidates are consumed one at a time from the session's cursor; connector
/// messages are loaded per candidate through a separate lookup.
pub struct ArchivalStager<'a> {
    archiver: &'a dyn MessageArchiver,
    connector_messages: &'a dyn ConnectorMessageLookup,
    channel_id: &'a str,
}

impl<'a> ArchivalStager<'a> {
    pub fn new(
        archiver: &'a dyn MessageArchiver,
        connector_messages: &'a dyn ConnectorMessageLookup,
        channel_id: &'a str,
    ) -> Self {
        Self {
            archiver,
            connector_messages,
            channel_id,
        }
    }

    /// Archive every message eligible under `params`.
    ///
    /// Returns only after every candidate has been archived or skipped, so
    /// deletes issued afterwards with the same parameters never remove a
    /// message the archiver has not seen. The first error aborts the pass.
    pub async fn stage(
        &self,
        session: &mut dyn StoreSession,
        params: &PruneParams,
    ) -> Result<StageOutcome, AttemptError> {
        let mut outcome = StageOutcome::default();
        let mut candidates = session.archive_candidates(params);

        while let Some(candidate) = candidates.try_next().await? {
            outcome.candidates += 1;

            if self
                .archiver
                .is_archived(self.channel_id, candidate.message_id)
                .await?
            {
                outcome.already_archived += 1;
                continue;
            }

            let message = self.assemble(candidate).await?;
            self.archiver.archive(&message).await?;
            outcome.archived += 1;
        }

        Ok(outcome)
    }

    async fn assemble(&self, candidate: ArchiveCandidate) -> Result<Message, AttemptError> {
        let connector_messages = self
            .connector_messages
            .connector_messages(self.channel_id, candidate.message_id)
            .await?;

        Ok(Message {
            message_id: candidate.message_id,
            channel_id: self.channel_id.to_string(),
            received_date: candidate.received_date,
            processed: candidate.processed,
            server_id: candidate.server_id,
            import_id: candidate.import_id,
            connector_messages,
        })
    }
}
