// Tests for configuration loading and validation

use roadflow_core::config::{Config, ConfigError};
use std::io::Write;
use tempfile::NamedTempFile;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn test_load_from_missing_file_uses_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config::load_from(Some(dir.path().join("absent.toml"))).unwrap();

    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.map.position, [-2.1, 53.6138]);
    assert_eq!(config.selection.default_year, Some(2018));
}

#[test]
fn test_load_from_file() {
    let file = config_file(
        r#"
        log_file = "/tmp/roadflow-test.log"

        [api]
        base_url = "http://localhost:8080/api"
        timeout_secs = 4

        [map]
        position = [-1.55, 53.8]
        zoom = 10.0
        "#,
    );

    let config = Config::load_from(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.api.base_url, "http://localhost:8080/api");
    assert_eq!(config.api.timeout_secs, 4);
    assert_eq!(config.map.position, [-1.55, 53.8]);
    assert_eq!(config.map.zoom, 10.0);
    // untouched sections keep their defaults
    assert_eq!(config.map.pitch, 0.0);
    assert_eq!(config.selection.default_year, Some(2018));
    assert_eq!(
        config.log_file_path(),
        std::path::PathBuf::from("/tmp/roadflow-test.log")
    );
}

#[test]
fn test_invalid_base_url_rejected() {
    let file = config_file(
        r#"
        [api]
        base_url = "not a url"
        "#,
    );

    let err = Config::load_from(Some(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("api.base_url"));
}

#[test]
fn test_non_http_scheme_rejected() {
    let mut config = Config::default();
    config.api.base_url = "ftp://example.com/api".to_string();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("http or https"));
}

#[test]
fn test_zero_timeout_rejected() {
    let mut config = Config::default();
    config.api.timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_out_of_range_position_rejected() {
    let mut config = Config::default();
    config.map.position = [-2.1, 95.0];
    assert!(config.validate().is_err());

    config.map.position = [200.0, 53.0];
    assert!(config.validate().is_err());
}

#[test]
fn test_wrong_type_is_load_error() {
    let file = config_file(
        r#"
        [api]
        timeout_secs = "soon"
        "#,
    );

    let err = Config::load_from(Some(file.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_initial_state_uses_defaults() {
    let mut config = Config::default();
    config.selection.default_year = Some(2021);

    let state = config.initial_state();
    assert_eq!(state.selection.selected_year, Some(2021));
    assert!(state.selection.selected_authority_id.is_none());
    assert_eq!(state.viewport.position.lon, -2.1);
}

#[test]
fn test_build_gateway_from_config() {
    let mut config = Config::default();
    config.api.base_url = "http://localhost:9000/api".to_string();

    let gateway = config.build_gateway().unwrap();
    assert_eq!(gateway.base_url().as_str(), "http://localhost:9000/api/");
}

#[test]
fn test_default_config_path() {
    let path = Config::default_config_path();
    assert!(path.ends_with(".config/roadflow/config.toml"));
}
