use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Database configuration.
///
/// The database holds the channel message store that is pruned.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum DatabaseConfig {
    /// No database configured. Pruning is unavailable.
    #[default]
    None,

    /// SQLite message store.
    #[cfg(feature = "database-sqlite")]
    Sqlite(SqliteConfig),
}

impl DatabaseConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, DatabaseConfig::None)
    }

    /// Whether migrations should run automatically before pruning.
    pub fn run_migrations(&self) -> bool {
        match self {
            DatabaseConfig::None => false,
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(c) => c.run_migrations,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseConfig::None => Ok(()),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(c) => c.validate(),
        }
    }
}

/// SQLite configuration.
#[cfg(feature = "database-sqlite")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    pub path: String,

    /// Create the database file if it doesn't exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Run migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Maximum number of connections in the pool.
    /// A pruning session and the connector message lookup each hold one.
    #[serde(default = "default_sqlite_max_connections")]
    pub max_connections: u32,
}

#[cfg(feature = "database-sqlite")]
impl SqliteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.is_empty() {
            return Err(ConfigError::Validation(
                "SQLite path cannot be empty".into(),
            ));
        }
        if self.max_connections < 2 {
            return Err(ConfigError::Validation(
                "SQLite max_connections must be at least 2 (pruning session + lookups)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "database-sqlite")]
fn default_busy_timeout() -> u64 {
    5000 // 5 seconds
}

#[cfg(feature = "database-sqlite")]
fn default_sqlite_max_connections() -> u32 {
    5
}

#[cfg(feature = "database-sqlite")]
fn default_true() -> bool {
    true
}
