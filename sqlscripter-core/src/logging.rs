//! Shared logging setup for the sqlscripter binary.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line events
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Maps the CLI verbosity flags to a maximum log level.
///
/// `quiet` wins over any verbosity; 0 is INFO, 1 DEBUG, 2+ TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Event filter: `RUST_LOG` directives when set and valid, otherwise the
/// level from the CLI flags.
pub fn log_filter(verbose: u8, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    let from_flags = || EnvFilter::new(level_for(verbose, quiet).as_str().to_ascii_lowercase());

    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| from_flags()),
        None => from_flags(),
    }
}

/// Initializes structured logging based on verbosity level.
///
/// `RUST_LOG` takes precedence over `verbose`/`quiet`.
///
/// # Example
/// ```rust,no_run
/// use sqlscripter_core::logging::{LogFormat, init_logging};
///
/// init_logging(1, false, LogFormat::Text).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool, format: LogFormat) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, quiet, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| {
        crate::error::ScripterError::configuration(format!("Failed to initialize logging: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tracing::level_filters::LevelFilter;

    // Logging can only be initialized once per test process, so only the
    // level mapping and filter construction are exercised here.

    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }

    #[test]
    fn test_filter_from_flags_without_rust_log() {
        assert_eq!(log_filter(0, false, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(1, false, Some("  ")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(2, true, None).max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_rust_log_overrides_flags() {
        let filter = log_filter(0, true, Some("sqlscripter_core=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_invalid_rust_log_falls_back_to_flags() {
        let filter = log_filter(1, false, Some("sqlscripter_core=loudest"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
