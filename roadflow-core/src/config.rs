//! Configuration loading for roadflow.
//!
//! Values are layered with figment: built-in defaults, then the TOML config
//! file, then `ROADFLOW_`-prefixed environment variables (nested keys use `__`,
//! e.g. `ROADFLOW_API__BASE_URL`).

use crate::state::{AppState, DEFAULT_POSITION, DEFAULT_YEAR, DEFAULT_ZOOM, ViewportState};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use roadflow_gateway::HttpGateway;
use roadflow_gateway::http::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/roadflow";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "roadflow.log";
const ENV_PREFIX: &str = "ROADFLOW_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub map: MapConfig,
    pub selection: SelectionConfig,
    /// Where logs go while the terminal UI owns the screen.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Initial map camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[lon, lat]`
    pub position: [f64; 2],
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub default_year: Option<u16>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            position: [DEFAULT_POSITION.lon, DEFAULT_POSITION.lat],
            zoom: DEFAULT_ZOOM,
            pitch: 0.0,
            bearing: 0.0,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            default_year: Some(DEFAULT_YEAR),
        }
    }
}

impl Config {
    /// Load from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an optional custom config file. A missing file is not an error.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_figment(Self::figment(&config_file))
    }

    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_dir() -> PathBuf {
        PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_DIR).as_ref())
    }

    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join(CONFIG_FILE_NAME)
    }

    /// Configured log file, or `roadflow.log` next to the config file.
    pub fn log_file_path(&self) -> PathBuf {
        match &self.log_file {
            Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
            None => Self::config_dir().join(LOG_FILE_NAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Invalid(format!("api.base_url '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        let [lon, lat] = self.map.position;
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(ConfigError::Invalid(format!(
                "map.position [{}, {}] is outside lon/lat range",
                lon, lat
            )));
        }
        if !(0.0..=24.0).contains(&self.map.zoom) {
            return Err(ConfigError::Invalid(format!(
                "map.zoom {} must be between 0 and 24",
                self.map.zoom
            )));
        }
        Ok(())
    }

    pub fn viewport(&self) -> ViewportState {
        ViewportState {
            position: roadflow_gateway::Position::new(self.map.position[0], self.map.position[1]),
            zoom: self.map.zoom,
            pitch: self.map.pitch,
            bearing: self.map.bearing,
            fit_bounds: None,
        }
    }

    /// Fresh application state seeded from the map and selection defaults.
    pub fn initial_state(&self) -> AppState {
        AppState::new(self.viewport(), self.selection.default_year)
    }

    pub fn build_gateway(&self) -> roadflow_gateway::error::Result<HttpGateway> {
        HttpGateway::with_options(
            &self.api.base_url,
            self.api.timeout_secs,
            &self.api.user_agent,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.selection.default_year, Some(2018));
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "roadflow.toml",
                r#"
                [api]
                base_url = "http://file.example/api"
                timeout_secs = 3

                [selection]
                default_year = 2019
                "#,
            )?;
            jail.set_env("ROADFLOW_API__BASE_URL", "http://env.example/api");

            let config = Config::from_figment(Config::figment(Path::new("roadflow.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.api.base_url, "http://env.example/api");
            assert_eq!(config.api.timeout_secs, 3);
            assert_eq!(config.selection.default_year, Some(2019));
            Ok(())
        });
    }

    #[test]
    fn test_viewport_from_map_config() {
        let mut config = Config::default();
        config.map.position = [-1.5, 52.0];
        config.map.zoom = 9.0;

        let viewport = config.viewport();
        assert_eq!(viewport.position.lon, -1.5);
        assert_eq!(viewport.position.lat, 52.0);
        assert_eq!(viewport.zoom, 9.0);
        assert!(viewport.fit_bounds.is_none());
    }
}
