//! Tracing initialization with configurable logging formats.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level and filter.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let filter = build_env_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match (&config.format, config.timestamps) {
        (LogFormat::Pretty, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init(),
        (LogFormat::Pretty, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Compact, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init(),
        (LogFormat::Compact, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Json, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line),
            )
            .try_init(),
        (LogFormat::Json, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_file(config.file_line)
                    .with_line_number(config.file_line)
                    .without_time(),
            )
            .try_init(),
    };

    result.map_err(|e| TracingError::Init(e.to_string()))
}

/// Build the environment filter from logging config.
fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    let base_level = config.level.as_str();

    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new(base_level))
    } else if let Some(filter) = &config.filter {
        let combined = format!("{},{}", base_level, filter);
        EnvFilter::try_new(combined).unwrap_or_else(|_| EnvFilter::new(base_level))
    } else {
        // Quiet per-statement logging from sqlx
        EnvFilter::new(format!("{},sqlx=warn", base_level))
    }
}

/// Tracing initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize tracing: {0}")]
    Init(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_filter_from_config() {
        temp_env::with_var_unset("RUST_LOG", || {
            let config = LoggingConfig {
                level: LogLevel::Debug,
                filter: Some("message_pruner=trace".to_string()),
                ..Default::default()
            };
            let filter = build_env_filter(&config).to_string();
            assert!(filter.contains("debug"));
            assert!(filter.contains("message_pruner=trace"));
        });
    }

    #[test]
    fn test_rust_log_overrides_config() {
        temp_env::with_var("RUST_LOG", Some("warn"), || {
            let filter = build_env_filter(&LoggingConfig::default()).to_string();
            assert_eq!(filter, "warn");
        });
    }
}
