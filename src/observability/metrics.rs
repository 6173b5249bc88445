//! Metrics for the message pruner.
//!
//! Counters are emitted through the `metrics` facade when the `prometheus`
//! feature is enabled; the embedding application installs the recorder.
//! Without the feature every function is a no-op.

#[cfg(feature = "prometheus")]
use metrics::counter;

/// Record rows deleted by a committed pruning run.
///
/// # Arguments
/// * `kind` - What was deleted ("messages" or "content")
/// * `channel_id` - The channel that was pruned
/// * `count` - The number of rows deleted
pub fn record_prune_deletion(kind: &str, channel_id: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "pruner_deletions_total",
            "kind" => kind.to_string(),
            "channel" => channel_id.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (kind, channel_id, count);
    }
}

/// Record the outcome of one pruning attempt ("committed", "failed" or "exhausted").
pub fn record_prune_attempt(outcome: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!("pruner_attempts_total", "outcome" => outcome.to_string()).increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = outcome;
    }
}

/// Record messages handed to the archival sink.
pub fn record_archived(channel_id: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("pruner_archived_total", "channel" => channel_id.to_string()).increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (channel_id, count);
    }
}
