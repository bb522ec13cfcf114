//! Configuration file schema.
//!
//! [`MerlinConfig`] mirrors the runtime types one to one but stays plain
//! data, so it can be written as TOML or JSON and overridden from the
//! environment before being turned into a [`ServerConfig`] and a
//! [`LogConfig`].

use std::net::SocketAddr;
use std::time::Duration;

use merlin_server::{
    ServerConfig, DEFAULT_HTTP_ADDR, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use merlin_telemetry::{create_env_filter, LogConfig};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Complete Merlin configuration.
///
/// ```
/// use merlin_config::MerlinConfig;
///
/// let config = MerlinConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MerlinConfig {
    /// `[server]` section.
    #[serde(default)]
    pub server: ServerSection,

    /// `[logging]` section.
    #[serde(default)]
    pub logging: LogConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address.
    pub http_addr: String,
    /// Grace period for in-flight requests on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Upper bound on a single request.
    pub request_timeout_secs: u64,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Answer 405 with `Allow` when only the method differs.
    pub method_not_allowed: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_body_bytes: ServerConfig::default().max_body_bytes(),
            method_not_allowed: false,
        }
    }
}

impl MerlinConfig {
    /// Local development preset: pretty debug logs, 405 answers on.
    #[must_use]
    pub fn development() -> Self {
        Self {
            server: ServerSection {
                http_addr: "127.0.0.1:8080".to_string(),
                method_not_allowed: true,
                ..ServerSection::default()
            },
            logging: LogConfig::development(),
        }
    }

    /// Production preset: JSON logs at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            server: ServerSection::default(),
            logging: LogConfig::production(),
        }
    }

    /// Checks values serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }
        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }
        Ok(())
    }

    /// Builds the runtime server configuration.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::builder()
            .http_addr(self.server.http_addr.as_str())
            .shutdown_timeout(Duration::from_secs(self.server.shutdown_timeout_secs))
            .request_timeout(Duration::from_secs(self.server.request_timeout_secs))
            .max_body_bytes(self.server.max_body_bytes)
            .method_not_allowed(self.server.method_not_allowed)
            .build()
    }

    /// Returns the logging configuration.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        self.logging.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merlin_telemetry::LogFormat;

    #[test]
    fn test_defaults_match_runtime_defaults() {
        let config = MerlinConfig::default();
        assert_eq!(config.server_config(), ServerConfig::default());
        assert_eq!(config.log_config(), LogConfig::default());
    }

    #[test]
    fn test_presets() {
        let dev = MerlinConfig::development();
        assert!(dev.server.method_not_allowed);
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(dev.validate().is_ok());

        let prod = MerlinConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_server_config_conversion() {
        let mut config = MerlinConfig::default();
        config.server.http_addr = "127.0.0.1:3000".into();
        config.server.request_timeout_secs = 5;
        config.server.max_body_bytes = 1024;
        config.server.method_not_allowed = true;

        let server = config.server_config();
        assert_eq!(server.http_addr(), "127.0.0.1:3000");
        assert_eq!(server.request_timeout(), Duration::from_secs(5));
        assert_eq!(server.max_body_bytes(), 1024);
        assert!(server.method_not_allowed());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MerlinConfig::default();
        config.server.http_addr = "localhost".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.http_addr"
        ));

        let mut config = MerlinConfig::default();
        config.server.max_body_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = MerlinConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = MerlinConfig::default();
        config.logging.level = "merlin=loud".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.level"
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = serde_json::from_str::<MerlinConfig>(r#"{"server": {"port": 80}}"#);
        assert!(err.is_err());
        let err = serde_json::from_str::<MerlinConfig>(r#"{"metrics": {}}"#);
        assert!(err.is_err());
    }
}
