//! Threshold-driven retention pruning for a channel message store.
//!
//! [`MessagePruner`] deletes the messages of a channel (or only their content)
//! that are older than a retention threshold, archiving each one to an
//! optional [`MessageArchiver`] first. Every attempt runs in a single store
//! transaction and is retried from scratch when it fails.

pub mod archive;
pub mod config;
pub mod db;
pub mod models;
pub mod observability;
pub mod pruner;

pub use archive::MessageArchiver;
pub use models::{PruneRequest, PruneResult};
pub use pruner::{MessagePruner, PrunerError, PrunerResult, PrunerSettings};
