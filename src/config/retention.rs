//! Message retention configuration.
//!
//! Controls which messages the pruner may delete and how hard it tries.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! skip_incomplete = true
//! skip_statuses = ["error", "queued"]
//! retry_count = 2
//!
//! [retention.periods]
//! message_days = 90
//! content_days = 30
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::Status;

/// Message retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Keep messages that have not finished processing.
    /// Default: true
    #[serde(default = "default_skip_incomplete")]
    pub skip_incomplete: bool,

    /// Keep messages where any connector is in one of these statuses.
    /// Accepts status names ("error") or codes ("E").
    /// Default: none
    #[serde(default)]
    pub skip_statuses: Vec<String>,

    /// Additional attempts after a failed pruning attempt.
    /// Default: 0 (a single attempt)
    #[serde(default)]
    pub retry_count: u32,

    /// Default retention periods, used when no thresholds are given explicitly.
    #[serde(default)]
    pub periods: RetentionPeriods,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            skip_incomplete: default_skip_incomplete(),
            skip_statuses: Vec::new(),
            retry_count: 0,
            periods: RetentionPeriods::default(),
        }
    }
}

fn default_skip_incomplete() -> bool {
    true
}

/// Retention periods in days.
///
/// Set to 0 to disable that kind of pruning (keep forever).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionPeriods {
    /// Days to keep whole messages.
    #[serde(default)]
    pub message_days: u32,

    /// Days to keep message content (payloads); metadata is kept until
    /// `message_days`.
    #[serde(default)]
    pub content_days: u32,
}

impl RetentionPeriods {
    /// Threshold for full-message pruning relative to `now`.
    pub fn message_threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        days_before(now, self.message_days)
    }

    /// Threshold for content-only pruning relative to `now`.
    pub fn content_threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        days_before(now, self.content_days)
    }
}

fn days_before(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    (days > 0).then(|| now - Duration::days(i64::from(days)))
}

impl RetentionConfig {
    /// Parse the configured skip statuses.
    pub fn parsed_skip_statuses(&self) -> Result<BTreeSet<Status>, ConfigError> {
        self.skip_statuses
            .iter()
            .map(|s| s.parse::<Status>().map_err(ConfigError::Validation))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_skip_statuses()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetentionConfig::default();
        assert!(config.skip_incomplete);
        assert!(config.skip_statuses.is_empty());
        assert_eq!(config.retry_count, 0);
        assert_eq!(config.periods.message_days, 0);
        assert_eq!(config.periods.content_days, 0);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            skip_incomplete = false
            skip_statuses = ["error", "Q"]
            retry_count = 3

            [periods]
            message_days = 90
            content_days = 30
        "#;
        let config: RetentionConfig = toml::from_str(toml).unwrap();
        assert!(!config.skip_incomplete);
        assert_eq!(config.retry_count, 3);
        assert_eq!(
            config.parsed_skip_statuses().unwrap(),
            BTreeSet::from([Status::Error, Status::Queued])
        );
        assert_eq!(config.periods.message_days, 90);
        assert_eq!(config.periods.content_days, 30);
    }

    #[test]
    fn test_invalid_status_rejected() {
        let config = RetentionConfig {
            skip_statuses: vec!["archived".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_period_thresholds() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let periods = RetentionPeriods {
            message_days: 10,
            content_days: 0,
        };
        assert_eq!(
            periods.message_threshold(now),
            Some(now - Duration::days(10))
        );
        assert_eq!(periods.content_threshold(now), None);
    }
}
