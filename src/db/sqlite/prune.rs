use std::collections::HashSet;

use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use sqlx::{
    Row, Sqlite, SqlitePool, Transaction,
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
};

use crate::db::{
    error::DbResult,
    repos::{ArchiveCandidate, PruneParams, PruneStatement, PruneStore, StoreSession},
};

/// Predicate selecting the messages eligible for pruning, with `m` aliasing `messages`.
///
/// Bound parameters: ?1 channel local id, ?2 date threshold, ?3 skip incomplete,
/// ?4 skip status codes packed into one string.
macro_rules! eligible_predicate {
    () => {
        "m.channel_local_id = ?1 \
         AND m.received_date < ?2 \
         AND (?3 = 0 OR m.processed = 1) \
         AND NOT EXISTS ( \
             SELECT 1 FROM connector_messages s \
             WHERE s.channel_local_id = m.channel_local_id \
               AND s.message_id = m.id \
               AND instr(?4, s.status) > 0 \
         )"
    };
}

/// Delete rows of `$table` (keyed by `$column`) that belong to eligible messages.
macro_rules! delete_dependent {
    ($table:literal, $column:literal) => {
        concat!(
            "DELETE FROM ",
            $table,
            " WHERE channel_local_id = ?1 AND ",
            $column,
            " IN (SELECT m.id FROM messages m WHERE ",
            eligible_predicate!(),
            ")"
        )
    };
}

const SELECT_ARCHIVE_CANDIDATES: &str = concat!(
    "SELECT m.id, m.received_date, m.processed, m.server_id, m.import_id \
     FROM messages m WHERE ",
    eligible_predicate!(),
    " ORDER BY m.id"
);

const DELETE_MESSAGE_CONTENT: &str = delete_dependent!("message_content", "message_id");
const DELETE_CUSTOM_METADATA: &str = delete_dependent!("message_custom_metadata", "message_id");
const DELETE_ATTACHMENTS: &str = delete_dependent!("message_attachments", "message_id");
const DELETE_CONNECTOR_MESSAGES: &str = delete_dependent!("connector_messages", "message_id");
const DELETE_MESSAGES: &str = delete_dependent!("messages", "id");

impl PruneStatement {
    fn sqlite_sql(&self) -> &'static str {
        match self {
            PruneStatement::DeleteMessageContent => DELETE_MESSAGE_CONTENT,
            PruneStatement::DeleteCustomMetadata => DELETE_CUSTOM_METADATA,
            PruneStatement::DeleteAttachments => DELETE_ATTACHMENTS,
            PruneStatement::DeleteConnectorMessages => DELETE_CONNECTOR_MESSAGES,
            PruneStatement::DeleteMessages => DELETE_MESSAGES,
        }
    }

    /// Table the statement deletes from; its absence means the statement is unsupported.
    fn sqlite_table(&self) -> &'static str {
        match self {
            PruneStatement::DeleteMessageContent => "message_content",
            PruneStatement::DeleteCustomMetadata => "message_custom_metadata",
            PruneStatement::DeleteAttachments => "message_attachments",
            PruneStatement::DeleteConnectorMessages => "connector_messages",
            PruneStatement::DeleteMessages => "messages",
        }
    }
}

fn bind_params<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &PruneParams,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(params.channel_storage_id)
        .bind(params.date_threshold)
        .bind(params.skip_incomplete)
        .bind(params.skip_status_codes())
}

fn candidate_from_row(row: &SqliteRow) -> DbResult<ArchiveCandidate> {
    Ok(ArchiveCandidate {
        message_id: row.try_get("id")?,
        received_date: row.try_get("received_date")?,
        processed: row.try_get("processed")?,
        server_id: row.try_get("server_id")?,
        import_id: row.try_get("import_id")?,
    })
}

/// SQLite-backed source of pruning sessions.
pub struct SqlitePruneStore {
    pool: SqlitePool,
}

impl SqlitePruneStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PruneStore for SqlitePruneStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreSession>> {
        // Take the write lock up front. A deferred transaction would read first
        // and fail to upgrade while another channel's session is writing.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        // Optional statements are resolved against the schema once per session
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&mut *tx)
                .await?;

        Ok(Box::new(SqlitePruneSession {
            tx,
            tables: tables.into_iter().collect(),
        }))
    }
}

/// A pruning session wrapping one SQLite transaction.
///
/// The transaction rolls back when the session is dropped uncommitted.
pub struct SqlitePruneSession {
    tx: Transaction<'static, Sqlite>,
    tables: HashSet<String>,
}

#[async_trait]
impl StoreSession for SqlitePruneSession {
    fn supports(&self, statement: PruneStatement) -> bool {
        self.tables.contains(statement.sqlite_table())
    }

    async fn delete(&mut self, statement: PruneStatement, params: &PruneParams) -> DbResult<u64> {
        let result = bind_params(sqlx::query(statement.sqlite_sql()), params)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    fn archive_candidates<'a>(
        &'a mut self,
        params: &'a PruneParams,
    ) -> BoxStream<'a, DbResult<ArchiveCandidate>> {
        bind_params(sqlx::query(SELECT_ARCHIVE_CANDIDATES), params)
            .fetch(&mut *self.tx)
            .map(|row| candidate_from_row(&row?))
            .boxed()
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
