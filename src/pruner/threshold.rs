//! Resolution of the two retention thresholds into an effective plan.

use chrono::{DateTime, Utc};

/// Effective thresholds for one pruning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Delete whole messages (and all their dependent rows) older than this.
    pub message_threshold: Option<DateTime<Utc>>,
    /// Delete only content older than this. Always strictly after
    /// `message_threshold` when both are set.
    pub content_threshold: Option<DateTime<Utc>>,
}

impl RetentionPlan {
    pub fn resolve(
        message_threshold: Option<DateTime<Utc>>,
        content_threshold: Option<DateTime<Utc>>,
    ) -> Self {
        let (message_threshold, content_threshold) = resolve(message_threshold, content_threshold);
        Self {
            message_threshold,
            content_threshold,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message_threshold.is_none() && self.content_threshold.is_none()
    }

    /// Threshold the archival pass selects against.
    ///
    /// Covers every message any step of the cascade can touch: the content
    /// threshold when set (it is the later one), otherwise the message threshold.
    pub fn archive_threshold(&self) -> Option<DateTime<Utc>> {
        self.content_threshold.or(self.message_threshold)
    }
}

/// Drop the content threshold when it is not after the message threshold.
///
/// Full-message pruning already deletes the content of every message it
/// removes, so content-only pruning up to an earlier-or-equal point is redundant.
pub fn resolve(
    message_threshold: Option<DateTime<Utc>>,
    content_threshold: Option<DateTime<Utc>>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match (message_threshold, content_threshold) {
        (Some(message), Some(content)) if content <= message => (Some(message), None),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use super::*;

    fn at(days_ago: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() - Duration::days(days_ago)
    }

    #[rstest]
    #[case::neither(None, None, None, None)]
    #[case::message_only(Some(30), None, Some(30), None)]
    #[case::content_only(None, Some(7), None, Some(7))]
    #[case::content_after_message(Some(30), Some(7), Some(30), Some(7))]
    #[case::content_equal_to_message(Some(30), Some(30), Some(30), None)]
    #[case::content_before_message(Some(7), Some(30), Some(7), None)]
    fn test_resolve(
        #[case] message: Option<i64>,
        #[case] content: Option<i64>,
        #[case] expected_message: Option<i64>,
        #[case] expected_content: Option<i64>,
    ) {
        let plan = RetentionPlan::resolve(message.map(at), content.map(at));
        assert_eq!(plan.message_threshold, expected_message.map(at));
        assert_eq!(plan.content_threshold, expected_content.map(at));
    }

    #[test]
    fn test_archive_threshold_prefers_content() {
        let plan = RetentionPlan::resolve(Some(at(30)), Some(at(7)));
        assert_eq!(plan.archive_threshold(), Some(at(7)));

        let plan = RetentionPlan::resolve(Some(at(30)), None);
        assert_eq!(plan.archive_threshold(), Some(at(30)));

        let plan = RetentionPlan::resolve(None, None);
        assert!(plan.is_empty());
        assert_eq!(plan.archive_threshold(), None);
    }
}
