//! Retention pruner for the message store.
//!
//! One call to [`MessagePruner::prune`] deletes the messages of a channel that
//! fell out of retention, and optionally archives them first:
//!
//! 1. the two thresholds are resolved into a [`RetentionPlan`] (once)
//! 2. each attempt opens a fresh store session, archives every eligible message
//!    not yet archived, runs the [`DeletionCascade`] and commits
//! 3. a failed attempt is rolled back and rerun from scratch until the
//!    [`RetryController`] gives up
//!
//! Archiving is not part of the store transaction. When an attempt fails after
//! archiving, the archived copies stay; the next attempt finds them already
//! archived and goes straight to deleting.

pub mod cascade;
mod error;
pub mod retry;
pub mod stager;
pub mod threshold;


use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, Utc};

pub use cascade::{CascadeCapabilities, DeletionCascade};
pub use error::{AttemptError, PrunerError, PrunerResult};
pub use retry::{AfterFailure, RetryController, RetryState};
pub use stager::{ArchivalStager, StageOutcome};
pub use threshold::RetentionPlan;

use crate::{
    archive::MessageArchiver,
    config::{ConfigError, RetentionConfig},
    db::{ChannelIdResolver, ConnectorMessageLookup, DbPool, PruneParams, PruneStore, StoreSession},
    models::{PruneRequest, PruneResult, Status},
    observability::metrics,
};

/// Filters and retry budget applied to every run of a pruner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunerSettings {
    /// Keep messages where any connector is in one of these statuses.
    pub skip_statuses: BTreeSet<Status>,
    /// Keep messages that have not finished processing.
    pub skip_incomplete: bool,
    /// Additional attempts after the first one fails.
    pub retry_count: u32,
}

impl Default for PrunerSettings {
    fn default() -> Self {
        Self {
            skip_statuses: BTreeSet::new(),
            skip_incomplete: true,
            retry_count: 0,
        }
    }
}

impl PrunerSettings {
    pub fn from_config(config: &RetentionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            skip_statuses: config.parsed_skip_statuses()?,
            skip_incomplete: config.skip_incomplete,
            retry_count: config.retry_count,
        })
    }
}

/// Prunes old messages of one channel at a time.
///
/// A pruner holds no per-run state, so one instance can serve concurrent runs
/// for different channels; each run uses its own store sessions.
pub struct MessagePruner {
    store: Arc<dyn PruneStore>,
    channels: Arc<dyn ChannelIdResolver>,
    connector_messages: Arc<dyn ConnectorMessageLookup>,
    archiver: Option<Arc<dyn MessageArchiver>>,
    settings: PrunerSettings,
}

impl MessagePruner {
    pub fn new(
        store: Arc<dyn PruneStore>,
        channels: Arc<dyn ChannelIdResolver>,
        connector_messages: Arc<dyn ConnectorMessageLookup>,
        settings: PrunerSettings,
    ) -> Self {
        Self {
            store,
            channels,
            connector_messages,
            archiver: None,
            settings,
        }
    }

    /// Create a pruner backed by the collaborators of a database pool.
    pub fn from_db(db: &DbPool, settings: PrunerSettings) -> Self {
        Self::new(
            db.prune_store(),
            db.channels(),
            db.connector_messages(),
            settings,
        )
    }

    /// Archive every message to `archiver` before it is deleted.
    pub fn with_archiver(mut self, archiver: Arc<dyn MessageArchiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Prune a channel.
    ///
    /// Whole messages received before `message_threshold` are deleted along
    /// with all their dependent rows; content of messages received before
    /// `content_threshold` is deleted while the messages are kept. With
    /// neither threshold set this returns immediately without touching the
    /// store.
    pub async fn prune(
        &self,
        channel_id: &str,
        message_threshold: Option<DateTime<Utc>>,
        content_threshold: Option<DateTime<Utc>>,
    ) -> PrunerResult<PruneResult> {
        if message_threshold.is_none() && content_threshold.is_none() {
            tracing::debug!(channel_id, "No thresholds given, nothing to prune");
            return Ok(PruneResult::default());
        }

        let channel_storage_id = self.channels.storage_id(channel_id).await.map_err(|source| {
            PrunerError::ChannelLookup {
                channel_id: channel_id.to_string(),
                source,
            }
        })?;

        let request = PruneRequest {
            channel_id: channel_id.to_string(),
            channel_storage_id,
            message_date_threshold: message_threshold,
            content_date_threshold: content_threshold,
            skip_statuses: self.settings.skip_statuses.clone(),
            skip_incomplete: self.settings.skip_incomplete,
            retry_count: self.settings.retry_count,
        };

        self.execute(&request).await
    }

    /// Run a fully resolved request, retrying failed attempts.
    ///
    /// Counts come from the committed attempt only. When every attempt fails
    /// the last failure is returned inside [`PrunerError::RetriesExhausted`].
    #[tracing::instrument(
        skip(self, request),
        fields(
            channel_id = %request.channel_id,
            channel_storage_id = request.channel_storage_id,
        )
    )]
    pub async fn execute(&self, request: &PruneRequest) -> PrunerResult<PruneResult> {
        let plan = RetentionPlan::resolve(
            request.message_date_threshold,
            request.content_date_threshold,
        );
        if plan.is_empty() {
            return Ok(PruneResult::default());
        }
        let mut controller = RetryController::new(request.retry_count);

        loop {
            let attempt = controller.attempt();

            match self.run_attempt(request, plan).await {
                Ok(result) => {
                    controller.on_success();
                    metrics::record_prune_attempt("committed");
                    metrics::record_prune_deletion(
                        "messages",
                        &request.channel_id,
                        result.messages_pruned,
                    );
                    metrics::record_prune_deletion(
                        "content",
                        &request.channel_id,
                        result.content_pruned,
                    );

                    if result.has_deletions() {
                        tracing::info!(
                            messages = result.messages_pruned,
                            content = result.content_pruned,
                            attempt,
                            "Pruning complete"
                        );
                    } else {
                        tracing::debug!(attempt, "Pruning complete, nothing to delete");
                    }
                    return Ok(result);
                }
                Err(error) => match controller.on_failure() {
                    AfterFailure::Retry { next } => {
                        metrics::record_prune_attempt("failed");
                        tracing::warn!(
                            error = %error,
                            attempt,
                            next_attempt = next,
                            max_attempts = controller.max_attempts(),
                            "Pruning attempt failed, retrying"
                        );
                    }
                    AfterFailure::Exhausted { attempts } => {
                        metrics::record_prune_attempt("exhausted");
                        tracing::error!(
                            error = %error,
                            attempts,
                            "Pruning failed, retries exhausted"
                        );
                        return Err(PrunerError::RetriesExhausted {
                            channel_id: request.channel_id.clone(),
                            attempts,
                            source: error,
                        });
                    }
                },
            }
        }
    }

    /// One attempt: a fresh session, archival, the cascade and a commit.
    ///
    /// Any failure rolls the session back before returning.
    async fn run_attempt(
        &self,
        request: &PruneRequest,
        plan: RetentionPlan,
    ) -> Result<PruneResult, AttemptError> {
        let mut session = self.store.begin().await?;

        match self.stage_and_delete(session.as_mut(), request, plan).await {
            Ok(result) => {
                tracing::debug!("Committing");
                session.commit().await?;
                Ok(result)
            }
            Err(error) => {
                if let Err(rollback_error) = session.rollback().await {
                    tracing::warn!(error = %rollback_error, "Failed to roll back pruning session");
                }
                Err(error)
            }
        }
    }

    async fn stage_and_delete(
        &self,
        session: &mut dyn StoreSession,
        request: &PruneRequest,
        plan: RetentionPlan,
    ) -> Result<PruneResult, AttemptError> {
        let capabilities = CascadeCapabilities::resolve(&*session);

        if let Some(archiver) = &self.archiver
            && let Some(threshold) = plan.archive_threshold()
        {
            tracing::debug!(%threshold, "Archiving messages");
            let stager = ArchivalStager::new(
                archiver.as_ref(),
                self.connector_messages.as_ref(),
                &request.channel_id,
            );
            let outcome = stager
                .stage(&mut *session, &params_for(request, threshold))
                .await?;
            metrics::record_archived(&request.channel_id, outcome.archived);
            tracing::debug!(
                candidates = outcome.candidates,
                archived = outcome.archived,
                already_archived = outcome.already_archived,
                "Archiving complete"
            );
        }

        DeletionCascade::new(request, plan, capabilities)
            .run(session)
            .await
    }
}

/// Statement parameters for `request` at `threshold`.
fn params_for(request: &PruneRequest, threshold: DateTime<Utc>) -> PruneParams {
    PruneParams {
        channel_storage_id: request.channel_storage_id,
        date_threshold: threshold,
        skip_statuses: request.skip_statuses.clone(),
        skip_incomplete: request.skip_incomplete,
    }
}
