mod channels;
mod connector_messages;
mod prune;

pub use channels::SqliteChannelIdResolver;
pub use connector_messages::SqliteConnectorMessageLookup;
pub use prune::{SqlitePruneSession, SqlitePruneStore};
