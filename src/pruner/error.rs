use thiserror::Error;

use crate::{archive::ArchiveError, db::DbError};

/// Failure of a single pruning attempt. Any of these aborts the attempt, which
/// is then rolled back and retried from scratch.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Error)]
pub enum PrunerError {
    #[error("Failed to resolve channel {channel_id}: {source}")]
    ChannelLookup {
        channel_id: String,
        #[source]
        source: DbError,
    },

    /// Every attempt failed; nothing from the last attempt was committed.
    #[error("Failed to prune messages for channel {channel_id} after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        channel_id: String,
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

pub type PrunerResult<T> = Result<T, PrunerError>;
