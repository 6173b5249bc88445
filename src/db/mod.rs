mod error;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, feature = "database-sqlite"))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached collaborator trait objects, created once at startup.
struct CachedRepos {
    prune_store: Arc<dyn PruneStore>,
    channels: Arc<dyn ChannelIdResolver>,
    connector_messages: Arc<dyn ConnectorMessageLookup>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(not(feature = "database-sqlite"))]
    _None(std::convert::Infallible),
}

/// Database pool for the message store.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            prune_store: Arc::new(sqlite::SqlitePruneStore::new(pool.clone())),
            channels: Arc::new(sqlite::SqliteChannelIdResolver::new(pool.clone())),
            connector_messages: Arc::new(sqlite::SqliteConnectorMessageLookup::new(pool.clone())),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                Ok(Self::from_sqlite(pool))
            }
        }
    }

    /// Run database migrations using sqlx's migration runner
    /// This automatically creates and manages a _sqlx_migrations table
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get the source of pruning sessions
    pub fn prune_store(&self) -> Arc<dyn PruneStore> {
        Arc::clone(&self.repos.prune_store)
    }

    /// Get the channel id resolver
    pub fn channels(&self) -> Arc<dyn ChannelIdResolver> {
        Arc::clone(&self.repos.channels)
    }

    /// Get the connector message lookup
    pub fn connector_messages(&self) -> Arc<dyn ConnectorMessageLookup> {
        Arc::clone(&self.repos.connector_messages)
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => pool.close().await,
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
