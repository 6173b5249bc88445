use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;

/// A single pruning run for one channel.
///
/// Thresholds are points in time; rows received strictly before a threshold
/// are eligible for the associated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneRequest {
    /// Public channel identifier
    pub channel_id: String,
    /// Storage identifier resolved from `channel_id`
    pub channel_storage_id: i64,
    /// Delete whole messages received before this time
    pub message_date_threshold: Option<DateTime<Utc>>,
    /// Delete only message content received before this time
    pub content_date_threshold: Option<DateTime<Utc>>,
    /// Messages with any connector in one of these statuses are kept
    pub skip_statuses: BTreeSet<Status>,
    /// Keep messages that have not finished processing
    pub skip_incomplete: bool,
    /// Additional attempts after the first one fails
    pub retry_count: u32,
}

/// Counts produced by one successful pruning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneResult {
    /// Number of message rows deleted.
    pub messages_pruned: u64,
    /// Number of content rows deleted, across both the content-only step and
    /// the full-message cascade.
    pub content_pruned: u64,
}

impl PruneResult {
    pub fn total(&self) -> u64 {
        self.messages_pruned + self.content_pruned
    }

    /// Check if anything was deleted.
    pub fn has_deletions(&self) -> bool {
        self.total() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_result_total() {
        let result = PruneResult {
            messages_pruned: 10,
            content_pruned: 25,
        };
        assert_eq!(result.total(), 35);
        assert!(result.has_deletions());
        assert!(!PruneResult::default().has_deletions());
    }
}
