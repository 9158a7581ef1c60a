//! Tracing/logging initialization.
//!
//! `RUST_LOG` always wins over the configured default filter, so normalizer
//! diagnostics (`plainjob_core=debug`) can be switched on without a rebuild.

use tracing_subscriber::EnvFilter;

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Human-readable single-line output.
    Compact,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Route output through the test writer (captured by `cargo test`).
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_filter: "info".to_string(),
            test_writer: false,
        }
    }
}

impl LogConfig {
    /// Compact, test-captured output with debug logs from the plainjob crates.
    pub fn for_tests() -> Self {
        Self {
            format: LogFormat::Compact,
            default_filter: "plainjob_core=debug,plainjob_jobs=debug".to_string(),
            test_writer: true,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// Install the global subscriber.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    // The builder's type changes with each layer choice, hence the four arms.
    let installed = match (config.format, config.test_writer) {
        (LogFormat::Json, false) => builder.json().try_init(),
        (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
        (LogFormat::Compact, false) => builder.compact().try_init(),
        (LogFormat::Compact, true) => builder.compact().with_test_writer().try_init(),
    };

    if installed.is_ok() {
        ::tracing::debug!(
            format = ?config.format,
            default_filter = %config.default_filter,
            "logging initialized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_json_at_info() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_filter, "info");
        assert!(!config.test_writer);
    }

    #[test]
    fn init_twice_is_a_no_op() {
        init(&LogConfig::for_tests());
        init(&LogConfig::for_tests().with_format(LogFormat::Json));
        ::tracing::info!("still logging");
    }
}
