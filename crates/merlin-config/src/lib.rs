//! Layered configuration for Merlin servers.
//!
//! Configuration is read from defaults, then TOML or JSON files, then
//! environment variables. Unknown keys are rejected at every layer.
//!
//! # Example
//!
//! ```no_run
//! use merlin_config::ConfigLoader;
//!
//! # fn main() -> Result<(), merlin_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("merlin.toml")?
//!     .with_env_prefix("MERLIN")
//!     .load()?;
//!
//! let server_config = config.server_config();
//! merlin_telemetry::init_logging(&config.log_config()).ok();
//! # let _ = server_config;
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_secs = 30
//! max_body_bytes = 10485760
//! method_not_allowed = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment overrides
//!
//! Variables take the form `PREFIX__SECTION__KEY`:
//!
//! - `MERLIN__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `MERLIN__LOGGING__LEVEL=merlin_server=debug,info`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;

pub use config::{MerlinConfig, ServerSection};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
