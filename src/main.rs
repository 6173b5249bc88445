use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use message_pruner::{
    MessagePruner, PrunerSettings, archive, config::PrunerConfig, db::DbPool,
    observability::tracing_init::init_tracing,
};

/// CLI arguments for the message pruner
#[derive(Parser, Debug)]
#[command(version, about = "Retention pruner for channel message stores", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (built-in defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Prune one channel and print the result as JSON
    Prune {
        /// Channel to prune
        #[arg(long)]
        channel: String,
        /// Delete whole messages older than this many days
        #[arg(long, conflicts_with = "message_before")]
        message_days: Option<u32>,
        /// Delete whole messages received before this RFC 3339 timestamp
        #[arg(long)]
        message_before: Option<DateTime<Utc>>,
        /// Delete message content older than this many days
        #[arg(long, conflicts_with = "content_before")]
        content_days: Option<u32>,
        /// Delete message content received before this RFC 3339 timestamp
        #[arg(long)]
        content_before: Option<DateTime<Utc>>,
    },
    /// Run database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = load_config(args.config.as_deref());
    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::Migrate => run_migrate(&config).await,
        Command::Prune {
            channel,
            message_days,
            message_before,
            content_days,
            content_before,
        } => {
            let now = Utc::now();
            let periods = &config.retention.periods;
            // Configured periods apply only when neither flag of a pair is given
            let message_threshold = match (message_days, message_before) {
                (None, None) => periods.message_threshold(now),
                (days, before) => threshold(days, before, now),
            };
            let content_threshold = match (content_days, content_before) {
                (None, None) => periods.content_threshold(now),
                (days, before) => threshold(days, before, now),
            };

            run_prune(&config, &channel, message_threshold, content_threshold).await;
        }
    }
}

fn load_config(path: Option<&str>) -> PrunerConfig {
    let Some(path) = path else {
        return PrunerConfig::default();
    };

    match PrunerConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

/// Resolve a threshold from a day count or an explicit timestamp. Zero days disables it.
fn threshold(
    days: Option<u32>,
    before: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match days {
        Some(0) => None,
        Some(days) => Some(now - Duration::days(i64::from(days))),
        None => before,
    }
}

async fn connect(config: &PrunerConfig) -> DbPool {
    if config.database.is_none() {
        eprintln!("Error: Database is not configured.");
        std::process::exit(1);
    }

    match DbPool::from_config(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            eprintln!("Error: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run database migrations and exit
async fn run_migrate(config: &PrunerConfig) {
    let db = connect(config).await;

    if let Err(e) = db.run_migrations().await {
        tracing::error!(error = %e, "Database migrations failed");
        eprintln!("Error: Database migrations failed: {}", e);
        std::process::exit(1);
    }
    db.close().await;
}

async fn run_prune(
    config: &PrunerConfig,
    channel_id: &str,
    message_threshold: Option<DateTime<Utc>>,
    content_threshold: Option<DateTime<Utc>>,
) {
    let settings = match PrunerSettings::from_config(&config.retention) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let db = connect(config).await;
    if config.database.run_migrations()
        && let Err(e) = db.run_migrations().await
    {
        tracing::error!(error = %e, "Database migrations failed");
        eprintln!("Error: Database migrations failed: {}", e);
        std::process::exit(1);
    }

    let mut pruner = MessagePruner::from_db(&db, settings);
    match archive::from_config(&config.archive).await {
        Ok(Some(archiver)) => pruner = pruner.with_archiver(archiver),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize message archive");
            eprintln!("Error: Failed to initialize message archive: {}", e);
            std::process::exit(1);
        }
    }

    tracing::info!(
        channel_id,
        message_threshold = ?message_threshold,
        content_threshold = ?content_threshold,
        archive = config.archive.is_enabled(),
        "Pruning channel"
    );

    let result = pruner
        .prune(channel_id, message_threshold, content_threshold)
        .await;
    db.close().await;

    match result {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: Failed to serialize result: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_from_days() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(threshold(Some(3), None, now), Some(now - Duration::days(3)));
        assert_eq!(threshold(Some(0), None, now), None);
        assert_eq!(threshold(None, Some(now), now), Some(now));
        assert_eq!(threshold(None, None, now), None);
    }

    #[test]
    fn test_parse_prune_args() {
        let args = Args::try_parse_from([
            "message-pruner",
            "prune",
            "--channel",
            "chan-a",
            "--message-days",
            "90",
            "--content-before",
            "2024-01-01T00:00:00Z",
        ])
        .unwrap();

        let Command::Prune {
            channel,
            message_days,
            content_before,
            ..
        } = args.command
        else {
            panic!("expected prune command");
        };
        assert_eq!(channel, "chan-a");
        assert_eq!(message_days, Some(90));
        assert_eq!(
            content_before,
            Some("2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
    }

    #[test]
    fn test_conflicting_message_args_rejected() {
        let result = Args::try_parse_from([
            "message-pruner",
            "prune",
            "--channel",
            "chan-a",
            "--message-days",
            "90",
            "--message-before",
            "2024-01-01T00:00:00Z",
        ]);
        assert!(result.is_err());
    }
}
