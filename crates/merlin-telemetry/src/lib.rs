//! Logging setup for Merlin services.
//!
//! Merlin crates emit `tracing` events with structured fields; this crate
//! installs the subscriber that formats them.
//!
//! # Example
//!
//! ```rust,no_run
//! use merlin_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production()).expect("logging already initialised");
//! ```

#![doc(html_root_url = "https://docs.rs/merlin-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
