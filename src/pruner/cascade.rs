//! Ordered delete statements for content-only and full-message pruning.

use super::{error::AttemptError, params_for, threshold::RetentionPlan};
use crate::{
    db::{PruneStatement, StoreSession},
    models::{PruneRequest, PruneResult},
};

/// Which optional delete statements the store supports, resolved once per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeCapabilities {
    pub custom_metadata: bool,
    pub attachments: bool,
    pub connector_messages: bool,
}

impl CascadeCapabilities {
    pub fn resolve(session: &dyn StoreSession) -> Self {
        Self {
            custom_metadata: session.supports(PruneStatement::DeleteCustomMetadata),
            attachments: session.supports(PruneStatement::DeleteAttachments),
            connector_messages: session.supports(PruneStatement::DeleteConnectorMessages),
        }
    }

    /// Whether `statement` should run. Required statements always run.
    pub fn is_enabled(&self, statement: PruneStatement) -> bool {
        match statement {
            PruneStatement::DeleteCustomMetadata => self.custom_metadata,
            PruneStatement::DeleteAttachments => self.attachments,
            PruneStatement::DeleteConnectorMessages => self.connector_messages,
            PruneStatement::DeleteMessageContent | PruneStatement::DeleteMessages => true,
        }
    }
}

pub struct DeletionCascade<'a> {
    request: &'a PruneRequest,
    plan: RetentionPlan,
    capabilities: CascadeCapabilities,
}

impl<'a> DeletionCascade<'a> {
    pub fn new(
        request: &'a PruneRequest,
        plan: RetentionPlan,
        capabilities: CascadeCapabilities,
    ) -> Self {
        Self {
            request,
            plan,
            capabilities,
        }
    }

    /// Run every delete of the plan against `session`, in order:
    ///
    /// 1. content older than the content threshold
    /// 2. content older than the message threshold
    /// 3. custom metadata, attachments and connector messages older than the
    ///    message threshold, each only if supported
    /// 4. messages older than the message threshold
    ///
    /// Content counts from steps 1 and 2 are summed. Nothing is committed here.
    pub async fn run(&self, session: &mut dyn StoreSession) -> Result<PruneResult, AttemptError> {
        let mut result = PruneResult::default();
        let channel_id = self.request.channel_id.as_str();

        if let Some(threshold) = self.plan.content_threshold {
            tracing::debug!(channel_id, %threshold, "Pruning content");
            let params = params_for(self.request, threshold);
            result.content_pruned += session
                .delete(PruneStatement::DeleteMessageContent, &params)
                .await?;
        }

        if let Some(threshold) = self.plan.message_threshold {
            tracing::debug!(channel_id, %threshold, "Pruning messages");
            let params = params_for(self.request, threshold);
            result.content_pruned += session
                .delete(PruneStatement::DeleteMessageContent, &params)
                .await?;

            for statement in PruneStatement::OPTIONAL {
                if !self.capabilities.is_enabled(statement) {
                    tracing::debug!(channel_id, %statement, "Statement not supported, skipping");
                    continue;
                }
                session.delete(statement, &params).await?;
            }

            result.messages_pruned += session
                .delete(PruneStatement::DeleteMessages, &params)
                .await?;
        }

        Ok(result)
    }
}
