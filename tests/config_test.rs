//! Integration tests for loading configuration files

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use docs_hub::config::{Config, ConfigError, ENV_CONFIG_PATH, ENV_PORT, ENV_REFRESH_INTERVAL};
use docs_hub::registry::RegistryError;
use serial_test::serial;
use tempfile::NamedTempFile;

const YAML: &str = r#"
environment: staging
tenant: acme
region: us-east-1
refresh_interval: 2m
server:
  host: 127.0.0.1
  port: "9300"
  enable_cors: false
fetcher:
  timeout_secs: 3
services:
  - name: orders
    display_name: Order Service
    base_url: http://orders:8080
    tags: [commerce]
  - name: users
    base_url: https://users.internal
    doc_path: /openapi.json
"#;

fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn clear_env() {
    for key in [ENV_PORT, ENV_REFRESH_INTERVAL, ENV_CONFIG_PATH] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_load_yaml_file() {
    clear_env();
    let file = write_config(".yaml", YAML);

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.environment, "staging");
    assert_eq!(config.bind_address(), "127.0.0.1:9300");
    assert!(!config.server.enable_cors);
    assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
    assert_eq!(config.refresh_duration(), Duration::from_secs(120));

    let registry = config.registry().unwrap();
    assert_eq!(registry.names(), vec!["orders", "users"]);
    assert_eq!(
        registry.get("users").unwrap().doc_url(),
        "https://users.internal/openapi.json"
    );
}

#[test]
#[serial]
fn test_load_toml_file() {
    clear_env();
    let file = write_config(
        ".toml",
        r#"
environment = "prod"

[server]
port = 9400

[[services]]
name = "billing"
base_url = "http://billing:8080"
health_check = "/ping"
"#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.server.port, 9400);
    assert_eq!(config.services[0].health_url(), "http://billing:8080/ping");
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    let file = write_config(".yaml", YAML);

    std::env::set_var(ENV_PORT, "9555");
    std::env::set_var(ENV_REFRESH_INTERVAL, "45s");
    let config = Config::load(file.path());
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.server.port, 9555);
    assert_eq!(config.refresh_duration(), Duration::from_secs(45));
}

#[test]
#[serial]
fn test_invalid_env_port_is_ignored() {
    clear_env();
    let file = write_config(".yaml", YAML);

    std::env::set_var(ENV_PORT, "not-a-port");
    let config = Config::load(file.path());
    clear_env();

    assert_eq!(config.unwrap().server.port, 9300);
}

#[test]
#[serial]
fn test_resolve_path() {
    clear_env();
    assert_eq!(Config::resolve_path(None), Path::new("configs/dev.yaml"));

    std::env::set_var(ENV_CONFIG_PATH, "/etc/docs-hub/prod.yaml");
    assert_eq!(Config::resolve_path(None), Path::new("/etc/docs-hub/prod.yaml"));
    assert_eq!(
        Config::resolve_path(Some(Path::new("local.yaml"))),
        Path::new("local.yaml")
    );
    clear_env();
}

#[test]
#[serial]
fn test_missing_file() {
    clear_env();
    let err = Config::load(Path::new("/nonexistent/docs-hub.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
#[serial]
fn test_duplicate_service_names_rejected() {
    clear_env();
    let file = write_config(
        ".yaml",
        r#"
services:
  - name: orders
    base_url: http://a:8080
  - name: orders
    base_url: http://b:8080
"#,
    );

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Registry(RegistryError::DuplicateService(ref name)) if name == "orders"
    ));
}

#[test]
#[serial]
fn test_malformed_yaml() {
    clear_env();
    let file = write_config(".yaml", "services: [\n  - name: orders\n");
    assert!(matches!(
        Config::load(file.path()).unwrap_err(),
        ConfigError::Yaml(_)
    ));
}
