use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::ConnectorMessageLookup,
    },
    models::{ConnectorMessage, Status},
};

pub struct SqliteConnectorMessageLookup {
    pool: SqlitePool,
}

impl SqliteConnectorMessageLookup {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_status(s: &str) -> DbResult<Status> {
        s.chars()
            .next()
            .and_then(Status::from_code)
            .ok_or_else(|| DbError::Internal(format!("Invalid connector message status: {}", s)))
    }
}

#[async_trait]
impl ConnectorMessageLookup for SqliteConnectorMessageLookup {
    async fn connector_messages(
        &self,
        channel_id: &str,
        message_id: i64,
    ) -> DbResult<BTreeMap<i32, ConnectorMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT cm.metadata_id, cm.connector_name, cm.status, cm.received_date, cm.send_attempts
            FROM connector_messages cm
            JOIN channels c ON c.local_id = cm.channel_local_id
            WHERE c.id = ? AND cm.message_id = ?
            ORDER BY cm.metadata_id
            "#,
        )
        .bind(channel_id)
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        let mut connector_messages = BTreeMap::new();
        for row in rows {
            let metadata_id: i32 = row.try_get("metadata_id")?;
            let status: String = row.try_get("status")?;
            let received_date: DateTime<Utc> = row.try_get("received_date")?;
            connector_messages.insert(
                metadata_id,
                ConnectorMessage {
                    metadata_id,
                    connector_name: row.try_get("connector_name")?,
                    status: Self::parse_status(&status)?,
                    received_date,
                    send_attempts: row.try_get("send_attempts")?,
                    contents: BTreeMap::new(),
                },
            );
        }

        if connector_messages.is_empty() {
            return Ok(connector_messages);
        }

        let content_rows = sqlx::query(
            r#"
            SELECT mc.metadata_id, mc.content_type, mc.content
            FROM message_content mc
            JOIN channels c ON c.local_id = mc.channel_local_id
            WHERE c.id = ? AND mc.message_id = ?
            "#,
        )
        .bind(channel_id)
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        for row in content_rows {
            let metadata_id: i32 = row.try_get("metadata_id")?;
            let content: Option<String> = row.try_get("content")?;
            // Content whose connector row is gone cannot be attached
            if let Some(cm) = connector_messages.get_mut(&metadata_id)
                && let Some(content) = content
            {
                cm.contents.insert(row.try_get("content_type")?, content);
            }
        }

        Ok(connector_messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::harness::{
        SeedMessage, create_sqlite_pool, days_ago, insert_channel, run_sqlite_migrations,
        seed_message,
    };

    #[tokio::test]
    async fn test_fetches_connector_messages_with_content() {
        let (pool, _dir) = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        insert_channel(&pool, "lab-results", 2).await;
        seed_message(&pool, 2, &SeedMessage::new(11, days_ago(40))).await;

        let lookup = SqliteConnectorMessageLookup::new(pool);
        let connector_messages = lookup.connector_messages("lab-results", 11).await.unwrap();

        assert_eq!(connector_messages.len(), 2);
        let source = &connector_messages[&0];
        assert_eq!(source.connector_name, "Source");
        assert_eq!(source.status, Status::Transformed);
        assert_eq!(source.contents.get(&1).map(String::as_str), Some("raw-11-0"));
        let destination = &connector_messages[&1];
        assert_eq!(destination.status, Status::Sent);
    }

    #[tokio::test]
    async fn test_missing_message_returns_empty_map() {
        let (pool, _dir) = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        insert_channel(&pool, "lab-results", 2).await;

        let lookup = SqliteConnectorMessageLookup::new(pool);
        let connector_messages = lookup.connector_messages("lab-results", 99).await.unwrap();
        assert!(connector_messages.is_empty());
    }
}
