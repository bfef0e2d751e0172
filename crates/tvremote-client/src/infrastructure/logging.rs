//! Structured logging setup.
//!
//! The library only emits `tracing` events; the embedding application calls
//! [`init_logging`] once at start-up to print them.  `RUST_LOG`, when set,
//! overrides the configured level.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("invalid log filter {directive:?}: {reason}")]
    InvalidFilter { directive: String, reason: String },

    /// A global subscriber was already installed.
    #[error("logging already initialised: {0}")]
    AlreadyInitialized(String),
}

/// Builds the filter: `RUST_LOG` if set and valid, else `level`.
///
/// `level` is validated even when `RUST_LOG` wins, so a bad configuration is
/// reported rather than hidden.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let configured = EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        directive: level.to_string(),
        reason: e.to_string(),
    })?;
    Ok(EnvFilter::try_from_default_env().unwrap_or(configured))
}

/// Installs a fmt subscriber filtered by [`build_filter`].
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] for a bad level and
/// [`LoggingError::AlreadyInitialized`] when called a second time.
pub fn init_logging(level: &str) -> Result<(), LoggingError> {
    let filter = build_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        let err = build_filter("tvremote_client=loudest").unwrap_err();

        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
    }

    #[test]
    fn test_valid_directives_build() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("warn,tvremote_client=debug").is_ok());
    }

    #[test]
    fn test_second_init_returns_error_instead_of_panicking() {
        // The first call may already fail if another test installed a
        // subscriber; the second must fail either way.
        let _ = init_logging("info");

        let second = init_logging("info");

        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
