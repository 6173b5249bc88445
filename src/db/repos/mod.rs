mod channels;
mod connector_messages;
mod prune;

pub use channels::*;
pub use connector_messages::*;
pub use prune::*;
