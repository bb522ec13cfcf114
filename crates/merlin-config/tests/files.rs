//! File and environment layering against real files.

use std::io::Write;
use std::time::Duration;

use merlin_config::{ConfigError, ConfigLoader};
use tempfile::{Builder, NamedTempFile};

fn config_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn toml_file_layers_over_defaults() {
    let file = config_file(
        ".toml",
        r#"
            [server]
            http_addr = "127.0.0.1:4000"
            request_timeout_secs = 10

            [logging]
            format = "pretty"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    let server = config.server_config();

    assert_eq!(server.http_addr(), "127.0.0.1:4000");
    assert_eq!(server.request_timeout(), Duration::from_secs(10));
    assert_eq!(server.shutdown_timeout(), Duration::from_secs(30));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn json_file_by_extension() {
    let file = config_file(".json", r#"{"server": {"method_not_allowed": true}}"#);
    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert!(config.server.method_not_allowed);
}

#[test]
fn unknown_extension_rejected() {
    let file = config_file(".ini", "[server]");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
}

#[test]
fn missing_files() {
    let err = ConfigLoader::new().with_file("/nonexistent/merlin.toml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));

    let config = ConfigLoader::new()
        .with_optional_file("/nonexistent/merlin.toml")
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.server.http_addr, "0.0.0.0:8080");
}

#[test]
fn invalid_values_fail_load() {
    let file = config_file(".toml", "[server]\nhttp_addr = \"not-an-address\"");
    let err = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn dotenv_file_feeds_env_overrides() {
    let env = config_file(
        ".env",
        "MERLIN_FILES_TEST__SERVER__MAX_BODY_BYTES=4096\nMERLIN_FILES_TEST__LOGGING__LEVEL=warn\n",
    );

    let config = ConfigLoader::new()
        .with_dotenv_file(env.path())
        .unwrap()
        .with_env_prefix("merlin_files_test")
        .load()
        .unwrap();

    assert_eq!(config.server.max_body_bytes, 4096);
    assert_eq!(config.logging.level, "warn");
}
