//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The level or directive string does not parse.
    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter {
        /// The rejected filter.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber could not be installed, usually because one
    /// already is.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}
