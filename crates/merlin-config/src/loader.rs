//! Layered configuration loading.
//!
//! Later layers override earlier ones:
//! 1. Built-in defaults or a preset
//! 2. Configuration files and strings (TOML or JSON)
//! 3. Environment variables
//!
//! File layers are merged key by key, so a file that only sets
//! `server.http_addr` keeps every other value from the layer below.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use merlin_telemetry::LogFormat;
use serde_json::Value;

use crate::{ConfigError, MerlinConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "MERLIN";

/// Builds a [`MerlinConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use merlin_config::ConfigLoader;
///
/// # fn main() -> Result<(), merlin_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("merlin.toml")?
///     .with_dotenv()?
///     .with_env_prefix("MERLIN")
///     .load()?;
///
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: MerlinConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from [`MerlinConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MerlinConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets the base layer to the development preset.
    ///
    /// ```
    /// use merlin_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MerlinConfig::development();
        self
    }

    /// Resets the base layer to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MerlinConfig::production();
        self
    }

    /// Merges a TOML or JSON file, chosen by extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let layer = parse_layer(&content, format)
            .map_err(|e| match e {
                ConfigError::UnsupportedFormat(_) => {
                    ConfigError::UnsupportedFormat(path.display().to_string())
                }
                other => other,
            })?;
        self.merge(layer)?;
        Ok(self)
    }

    /// Merges a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in `format` (`"toml"` or `"json"`).
    ///
    /// ```
    /// use merlin_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nmethod_not_allowed = true", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.server.method_not_allowed);
    /// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer = parse_layer(content, format)?;
        self.merge(layer)?;
        Ok(self)
    }

    /// Enables `PREFIX__SECTION__KEY` environment overrides.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory into the process environment.
    /// A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::env_parse(".env", e.to_string())),
        }
    }

    /// Loads a specific dotenv file into the process environment.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::from_path(path)
            .map_err(|e| ConfigError::env_parse(path.display().to_string(), e.to_string()))?;
        Ok(self)
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<MerlinConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env(&prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the merged configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> MerlinConfig {
        self.config
    }

    fn merge(&mut self, layer: Value) -> Result<(), ConfigError> {
        let mut base = serde_json::to_value(&self.config)?;
        merge_values(&mut base, layer);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    fn apply_env<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(setting) = key.strip_prefix(&marker) {
                self.apply_env_var(&key, setting, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, setting: &str, value: &str) -> Result<(), ConfigError> {
        let server = &mut self.config.server;
        let logging = &mut self.config.logging;
        let parts: Vec<&str> = setting.split("__").collect();

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_SECS"] => {
                server.request_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => server.max_body_bytes = parse_number(key, value)?,
            ["SERVER", "METHOD_NOT_ALLOWED"] => server.method_not_allowed = parse_flag(key, value)?,

            ["LOGGING", "ENABLED"] => logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse(
                            key,
                            "expected 'json', 'pretty' or 'compact'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => logging.span_events = parse_flag(key, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => logging.file_line_info = parse_flag(key, value)?,
            ["LOGGING", "THREAD_IDS"] => logging.thread_ids = parse_flag(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = parse_flag(key, value)?,

            _ => return Err(ConfigError::env_parse(key, "unknown setting")),
        }

        Ok(())
    }
}

fn parse_layer(content: &str, format: &str) -> Result<Value, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, MerlinConfig::default());
    }

    #[test]
    fn test_string_layer_keeps_unset_values() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string(r#"{"server": {"request_timeout_secs": 5}}"#, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.request_timeout_secs, 5);
        assert_eq!(config.server.http_addr, "127.0.0.1:8080");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_later_layers_win() {
        let config = ConfigLoader::new()
            .with_string("[logging]\nlevel = \"warn\"", "toml")
            .unwrap()
            .with_string(r#"{"logging": {"level": "error"}}"#, "json")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    fn test_unknown_field_in_layer() {
        let result = ConfigLoader::new().with_string("[server]\nport = 80", "toml");
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: b", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_merge_values() {
        let mut base = json!({"server": {"a": 1, "b": 2}, "logging": {"level": "info"}});
        merge_values(&mut base, json!({"server": {"b": 3}}));
        assert_eq!(base, json!({"server": {"a": 1, "b": 3}, "logging": {"level": "info"}}));
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env(
                "TEST",
                vars(&[
                    ("TEST__SERVER__HTTP_ADDR", "127.0.0.1:9000"),
                    ("TEST__SERVER__MAX_BODY_BYTES", "2048"),
                    ("TEST__SERVER__METHOD_NOT_ALLOWED", "on"),
                    ("TEST__LOGGING__FORMAT", "Compact"),
                    ("TEST__LOGGING__LEVEL", "trace"),
                    ("OTHER__SERVER__HTTP_ADDR", "ignored"),
                    ("TEST_HOME", "/home/test"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert_eq!(config.server.max_body_bytes, 2048);
        assert!(config.server.method_not_allowed);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env("TEST", vars(&[("TEST__SERVER__MAX_BODY_BYTES", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("expected integer"));

        let err = loader
            .apply_env("TEST", vars(&[("TEST__LOGGING__ENABLED", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("expected boolean"));

        let err = loader
            .apply_env("TEST", vars(&[("TEST__SERVER__PORT", "80")]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown setting"));
    }

    #[test]
    fn test_parse_bool() {
        for truthy in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(truthy), Some(true), "{truthy}");
        }
        for falsy in ["false", "False", "0", "no", "off"] {
            assert_eq!(parse_bool(falsy), Some(false), "{falsy}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
