//! Process-wide logging setup for plainjob producers and workers.
//!
//! Library crates only emit through `tracing`; binaries and test harnesses
//! call [`init`] (or [`init_with`]) once at startup.

/// Tracing subscriber configuration.
pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat};

/// Initialize logging with JSON output and an `info` default filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(&LogConfig::default());
}

/// Initialize logging with an explicit configuration.
pub fn init_with(config: &LogConfig) {
    tracing::init(config);
}
