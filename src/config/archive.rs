use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Archival sink configuration.
///
/// When a sink is configured, every message is archived before it is pruned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum ArchiveConfig {
    /// Prune without archiving.
    #[default]
    None,

    /// Archive messages as JSON documents on the local filesystem.
    File {
        /// Root directory of the archive.
        path: String,
    },
}

impl ArchiveConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ArchiveConfig::None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ArchiveConfig::None => Ok(()),
            ArchiveConfig::File { path } if path.trim().is_empty() => Err(
                ConfigError::Validation("archive.path cannot be empty".into()),
            ),
            ArchiveConfig::File { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_archive() {
        let config: ArchiveConfig = toml::from_str(
            r#"
            type = "file"
            path = "/srv/archive"
        "#,
        )
        .unwrap();
        assert!(config.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_path_rejected() {
        let config = ArchiveConfig::File {
            path: "  ".to_string(),
        };
        assert!(config.validate().is_err());
        assert!(!ArchiveConfig::default().is_enabled());
    }
}
