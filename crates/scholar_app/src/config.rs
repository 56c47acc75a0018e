//! Client configuration loaded from a RON file.
//!
//! Every field has a default, so a missing file is fine and a partial file
//! only overrides what it names.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use scholar_core::{Category, Settings};
use scholar_engine::{ApiFlavor, BackendSettings};
use scholar_logging::{scholar_info, scholar_warn};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILENAME: &str = "scholar_search.ron";
pub const BASE_URL_ENV: &str = "SCHOLAR_SEARCH_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("unknown log level {0:?}")]
    UnknownLogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub api_flavor: ApiFlavor,
    pub page_size: u32,
    pub harvest_interval_ms: u64,
    pub debounce_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_response_bytes: u64,
    pub category: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let backend = BackendSettings::default();
        let core = Settings::default();
        Self {
            base_url: backend.base_url,
            api_flavor: backend.flavor,
            page_size: core.page_size,
            harvest_interval_ms: core.harvest_interval_ms,
            debounce_ms: core.debounce_ms,
            connect_timeout_ms: backend.connect_timeout.as_millis() as u64,
            request_timeout_ms: backend.request_timeout.as_millis() as u64,
            max_response_bytes: backend.max_bytes,
            category: Category::default().as_str().to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or `./scholar_search.ron` when no path is given.
    ///
    /// The default file may be absent; an explicitly named one must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
        };

        let mut config = match fs::read_to_string(&path) {
            Ok(text) => {
                let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?;
                scholar_info!("Loaded config from {:?}", path);
                config
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.apply_base_url(base_url);
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn apply_base_url(&mut self, base_url: String) {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            scholar_warn!("Ignoring empty base url override");
            return;
        }
        self.base_url = trimmed.to_string();
    }

    pub fn category(&self) -> Result<Category, ConfigError> {
        Category::parse(&self.category).ok_or_else(|| ConfigError::UnknownCategory(self.category.clone()))
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        scholar_logging::parse_level(&self.log_level)
            .ok_or_else(|| ConfigError::UnknownLogLevel(self.log_level.clone()))
    }

    pub fn core_settings(&self) -> Settings {
        Settings {
            page_size: self.page_size.max(1),
            harvest_interval_ms: self.harvest_interval_ms,
            debounce_ms: self.debounce_ms,
        }
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            base_url: self.base_url.clone(),
            flavor: self.api_flavor,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_bytes: self.max_response_bytes,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(
            r#"(base_url: "https://search.example.org/api", api_flavor: QueryString, page_size: 50)"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://search.example.org/api");
        assert_eq!(config.api_flavor, ApiFlavor::QueryString);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.debounce_ms, AppConfig::default().debounce_ms);
        assert_eq!(config.category().unwrap(), Category::All);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.ron"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn file_values_are_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"(category: "elis", log_level: "debug", debounce_ms: 300)"#).unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.category().unwrap(), Category::Elis);
        assert_eq!(config.log_level().unwrap(), LevelFilter::Debug);
        assert_eq!(config.core_settings().debounce_ms, 300);
    }

    #[test]
    fn unparsable_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(page_size: \"many\")").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let config = AppConfig {
            category: "podcasts".to_string(),
            log_level: "loud".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.category(), Err(ConfigError::UnknownCategory(_))));
        assert!(matches!(config.log_level(), Err(ConfigError::UnknownLogLevel(_))));
    }

    #[test]
    fn backend_settings_carry_timeouts() {
        let config = AppConfig {
            request_timeout_ms: 1_500,
            ..AppConfig::default()
        };
        assert_eq!(
            config.backend_settings().request_timeout,
            Duration::from_millis(1_500)
        );
    }
}
