use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::db::{
    error::{DbError, DbResult},
    repos::ChannelIdResolver,
};

pub struct SqliteChannelIdResolver {
    pool: SqlitePool,
}

impl SqliteChannelIdResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelIdResolver for SqliteChannelIdResolver {
    async fn storage_id(&self, channel_id: &str) -> DbResult<i64> {
        let local_id: Option<i64> =
            sqlx::query_scalar("SELECT local_id FROM channels WHERE id = ?")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await?;

        local_id.ok_or_else(|| DbError::NotFound(format!("channel {}", channel_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::harness::{create_sqlite_pool, insert_channel, run_sqlite_migrations};

    #[tokio::test]
    async fn test_resolves_local_id() {
        let (pool, _dir) = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        insert_channel(&pool, "adt-inbound", 7).await;

        let resolver = SqliteChannelIdResolver::new(pool);
        assert_eq!(resolver.storage_id("adt-inbound").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let (pool, _dir) = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;

        let resolver = SqliteChannelIdResolver::new(pool);
        let err = resolver.storage_id("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
