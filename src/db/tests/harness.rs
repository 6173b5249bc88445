//! Test harness for SQLite message store testing

use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use crate::models::Status;

/// Create a WAL-mode SQLite pool backed by a file in a fresh temporary directory.
///
/// The directory is removed when the returned handle is dropped, so keep it alive
/// for the duration of the test.
pub async fn create_sqlite_pool() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(dir.path().join("messages.db"))
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .expect("Failed to create SQLite pool");
    (pool, dir)
}

/// Run SQLite migrations on the pool
///
/// Uses the actual migration files to ensure tests match production schema
pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

/// Fixed reference instant (whole seconds) so repeated calls agree with each other.
pub fn days_ago(days: i64) -> DateTime<Utc> {
    static NOW: OnceLock<DateTime<Utc>> = OnceLock::new();
    let now = *NOW.get_or_init(|| {
        DateTime::from_timestamp(Utc::now().timestamp(), 0).expect("valid timestamp")
    });
    now - Duration::days(days)
}

pub async fn insert_channel(pool: &SqlitePool, channel_id: &str, local_id: i64) {
    sqlx::query("INSERT INTO channels (id, local_id, name) VALUES (?, ?, ?)")
        .bind(channel_id)
        .bind(local_id)
        .bind(channel_id)
        .execute(pool)
        .await
        .expect("Failed to insert channel");
}

/// A message with a source and one destination connector, two content rows,
/// one custom metadata row and one attachment.
pub struct SeedMessage {
    pub id: i64,
    pub received_date: DateTime<Utc>,
    pub processed: bool,
    pub destination_status: Status,
}

impl SeedMessage {
    pub fn new(id: i64, received_date: DateTime<Utc>) -> Self {
        Self {
            id,
            received_date,
            processed: true,
            destination_status: Status::Sent,
        }
    }

    pub fn unprocessed(mut self) -> Self {
        self.processed = false;
        self
    }

    pub fn with_destination_status(mut self, status: Status) -> Self {
        self.destination_status = status;
        self
    }
}

pub async fn seed_message(pool: &SqlitePool, local_id: i64, message: &SeedMessage) {
    sqlx::query(
        "INSERT INTO messages (channel_local_id, id, server_id, received_date, processed, import_id) \
         VALUES (?, ?, 'node-1', ?, ?, NULL)",
    )
    .bind(local_id)
    .bind(message.id)
    .bind(message.received_date)
    .bind(message.processed)
    .execute(pool)
    .await
    .expect("Failed to insert message");

    let connectors = [
        (0, "Source", Status::Transformed),
        (1, "Destination 1", message.destination_status),
    ];
    for (metadata_id, name, status) in connectors {
        sqlx::query(
            "INSERT INTO connector_messages \
             (channel_local_id, message_id, metadata_id, connector_name, status, received_date, send_attempts) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(local_id)
        .bind(message.id)
        .bind(metadata_id)
        .bind(name)
        .bind(status.code().to_string())
        .bind(message.received_date)
        .bind(metadata_id)
        .execute(pool)
        .await
        .expect("Failed to insert connector message");

        sqlx::query(
            "INSERT INTO message_content (channel_local_id, message_id, metadata_id, content_type, content) \
             VALUES (?, ?, ?, 1, ?)",
        )
        .bind(local_id)
        .bind(message.id)
        .bind(metadata_id)
        .bind(format!("raw-{}-{}", message.id, metadata_id))
        .execute(pool)
        .await
        .expect("Failed to insert message content");
    }

    sqlx::query(
        "INSERT INTO message_custom_metadata (channel_local_id, message_id, metadata_id, name, value) \
         VALUES (?, ?, 0, 'patient_id', ?)",
    )
    .bind(local_id)
    .bind(message.id)
    .bind(format!("P{}", message.id))
    .execute(pool)
    .await
    .expect("Failed to insert custom metadata");

    sqlx::query(
        "INSERT INTO message_attachments (channel_local_id, message_id, id, segment_id, mime_type, content) \
         VALUES (?, ?, ?, 0, 'text/plain', ?)",
    )
    .bind(local_id)
    .bind(message.id)
    .bind(format!("att-{}", message.id))
    .bind(b"attachment".to_vec())
    .execute(pool)
    .await
    .expect("Failed to insert attachment");
}

/// Count rows of `table` belonging to a channel.
pub async fn count_rows(pool: &SqlitePool, table: &str, local_id: i64) -> i64 {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE channel_local_id = ?",
        table
    ))
    .bind(local_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count rows")
}
