mod message;
mod prune;

pub use message::*;
pub use prune::*;
