//! Configuration module for the message pruner.
//!
//! The pruner is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "sqlite"
//! path = "${DATA_DIR}/messages.db"
//!
//! [retention]
//! skip_statuses = ["error"]
//! retry_count = 2
//!
//! [archive]
//! type = "file"
//! path = "/srv/message-archive"
//! ```

mod archive;
mod database;
mod observability;
mod retention;

use std::{path::Path, sync::OnceLock};

pub use archive::*;
pub use database::*;
pub use observability::*;
pub use retention::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the message pruner.
///
/// All sections are optional with sensible defaults; only `[database]` is
/// needed to actually prune anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrunerConfig {
    /// Message store to prune.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Skip filters, retry budget and default retention periods.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Archival sink that receives messages before they are pruned.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl PrunerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        // Detect feature-gated values before typed deserialization, which would
        // otherwise fail with an opaque "unknown variant" error
        let raw: toml::Value = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        check_disabled_features(&raw)?;

        let config: PrunerConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.retention.validate()?;
        self.archive.validate()?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn check_disabled_features(raw: &toml::Value) -> Result<(), ConfigError> {
    let database_type = raw
        .get("database")
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str());

    match database_type {
        #[cfg(not(feature = "database-sqlite"))]
        Some("sqlite") => Err(ConfigError::Validation(
            "database.type = \"sqlite\" requires the 'database-sqlite' feature.\n\
             Rebuild with: cargo build --features database-sqlite"
                .into(),
        )),
        _ => Ok(()),
    }
}

fn env_var_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| regex::Regex::new(r"\$\{([^}]+)\}").expect("valid regex"))
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut lines = Vec::new();

    for line in input.split('\n') {
        let comment_pos = line.find('#').unwrap_or(line.len());
        let mut expanded = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in env_var_pattern().captures_iter(&line[..comment_pos]) {
            let Some(whole) = cap.get(0) else { continue };
            expanded.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            expanded.push_str(&value);
            last_end = whole.end();
        }

        expanded.push_str(&line[last_end..]);
        lines.push(expanded);
    }

    Ok(lines.join("\n"))
}
