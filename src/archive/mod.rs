//! Archival sinks that receive a copy of each message before it is pruned.
//!
//! A sink must be safe to query concurrently: pruners for different channels
//! may run at the same time and share one sink.

mod error;
mod file;
mod memory;
mod traits;

use std::sync::Arc;

pub use error::{ArchiveError, ArchiveResult};
pub use file::FileArchiver;
pub use memory::MemoryArchiver;
pub use traits::MessageArchiver;

use crate::config::ArchiveConfig;

/// Build the configured sink, or `None` when archiving is disabled.
pub async fn from_config(config: &ArchiveConfig) -> ArchiveResult<Option<Arc<dyn MessageArchiver>>> {
    match config {
        ArchiveConfig::None => Ok(None),
        ArchiveConfig::File { path } => {
            let archiver = FileArchiver::new(path).await?;
            Ok(Some(Arc::new(archiver)))
        }
    }
}
