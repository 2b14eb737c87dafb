//! Logging setup shared by binaries built on the moderation gate.
//!
//! Verbosity follows `RUST_LOG`; when it is unset the caller's default directive
//! applies. Libraries in this workspace only emit events, so installing a
//! subscriber is left to the binary.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Builds the filter from `RUST_LOG`, falling back to `default_directive`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the fallback directive is invalid.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, TelemetryError> {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default_directive)
}

fn filter_from(
    configured: Option<String>,
    default_directive: &str,
) -> Result<EnvFilter, TelemetryError> {
    let directive = configured
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_directive.to_owned());
    EnvFilter::try_new(&directive).map_err(|err| TelemetryError::InvalidFilter {
        reason: err.to_string(),
        directive,
    })
}

/// Installs a compact fmt subscriber as the global default.
///
/// # Errors
///
/// Fails when the filter is invalid or another subscriber was installed first.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryError> {
    let filter = env_filter(default_directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}
