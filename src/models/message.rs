use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of a connector message.
///
/// Stored as a single-character code in the message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Received,
    Filtered,
    Transformed,
    Sent,
    Queued,
    Error,
    Pending,
}

impl Status {
    /// All statuses, in storage-code order.
    pub const ALL: [Status; 7] = [
        Status::Received,
        Status::Filtered,
        Status::Transformed,
        Status::Sent,
        Status::Queued,
        Status::Error,
        Status::Pending,
    ];

    /// Single-character code used in the `status` column.
    pub fn code(&self) -> char {
        match self {
            Status::Received => 'R',
            Status::Filtered => 'F',
            Status::Transformed => 'T',
            Status::Sent => 'S',
            Status::Queued => 'Q',
            Status::Error => 'E',
            Status::Pending => 'P',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Received => write!(f, "received"),
            Status::Filtered => write!(f, "filtered"),
            Status::Transformed => write!(f, "transformed"),
            Status::Sent => write!(f, "sent"),
            Status::Queued => write!(f, "queued"),
            Status::Error => write!(f, "error"),
            Status::Pending => write!(f, "pending"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    /// Accepts either the snake_case name or the single-character code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && let Some(status) = Status::from_code(c.to_ascii_uppercase())
        {
            return Ok(status);
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "received" => Ok(Status::Received),
            "filtered" => Ok(Status::Filtered),
            "transformed" => Ok(Status::Transformed),
            "sent" => Ok(Status::Sent),
            "queued" => Ok(Status::Queued),
            "error" => Ok(Status::Error),
            "pending" => Ok(Status::Pending),
            _ => Err(format!("Invalid message status: {}", s)),
        }
    }
}

/// One connector's view of a message (the source connector is metadata id 0).
///
/// The pruner never interprets these; it only attaches them to the [`Message`]
/// handed to an archiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorMessage {
    /// Connector index within the channel (0 = source)
    pub metadata_id: i32,
    /// Display name of the connector
    pub connector_name: String,
    /// Current processing status
    pub status: Status,
    /// When the connector received the message
    pub received_date: DateTime<Utc>,
    /// Number of send attempts made by a destination connector
    pub send_attempts: i32,
    /// Stored content keyed by content type (raw, transformed, sent, response, ...)
    #[serde(default)]
    pub contents: BTreeMap<i32, String>,
}

/// Full message aggregate, reconstructed for archiving only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub channel_id: String,
    pub received_date: DateTime<Utc>,
    pub processed: bool,
    pub server_id: String,
    pub import_id: Option<i64>,
    /// Connector messages keyed by metadata id
    #[serde(default)]
    pub connector_messages: BTreeMap<i32, ConnectorMessage>,
}
