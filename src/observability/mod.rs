pub mod metrics;
#[cfg(feature = "cli")]
pub mod tracing_init;
