//! Shared database test infrastructure
//!
//! SQLite tests run against an on-disk database in a temporary directory so
//! that a pruning session and a connector message lookup can hold separate
//! connections at the same time, as they do in production.

pub mod harness;
