//! Server configuration: TOML file, then `LARCH_*` environment overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GeocodeError;
use crate::service::{ServiceSettings, DEFAULT_LICENCE};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub service: ServiceConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Elasticsearch,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub es_url: String,
    pub places_index: String,
    pub address_index: String,
    /// JSON fixture for the memory backend
    pub fixture: Option<PathBuf>,
    /// Per store call; 0 disables the timeout
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Elasticsearch,
            es_url: "http://localhost:9200".to_string(),
            places_index: "placex".to_string(),
            address_index: "place_addressline".to_string(),
            fixture: None,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub licence: String,
    /// Reported by `/status`; defaults to the crate version
    pub version: Option<String>,
    pub enable_details: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            licence: DEFAULT_LICENCE.to_string(),
            version: None,
            enable_details: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Per route
    pub requests_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 20.0,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply `LARCH_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("LARCH_LISTEN") {
            self.server.listen = v;
        }
        if let Some(v) = get("LARCH_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Some(v) = get("LARCH_ES_URL") {
            self.store.es_url = v;
        }
        if let Some(v) = get("LARCH_LICENCE") {
            self.service.licence = v;
        }
        if let Some(v) = get("LARCH_VERSION") {
            self.service.version = Some(v);
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.server.listen.trim().is_empty() {
            return Err(GeocodeError::Config("server.listen must not be empty".into()));
        }
        match self.store.backend {
            StoreBackend::Memory if self.store.fixture.is_none() => {
                return Err(GeocodeError::Config(
                    "store.fixture is required for the memory backend".into(),
                ));
            }
            StoreBackend::Elasticsearch => {
                url::Url::parse(&self.store.es_url).map_err(|e| {
                    GeocodeError::Config(format!("invalid store.es_url {}: {e}", self.store.es_url))
                })?;
                if self.store.places_index.is_empty() || self.store.address_index.is_empty() {
                    return Err(GeocodeError::Config("index names must not be empty".into()));
                }
            }
            StoreBackend::Memory => {}
        }
        if self.rate_limit.enabled
            && !(self.rate_limit.requests_per_second.is_finite()
                && self.rate_limit.requests_per_second > 0.0)
        {
            return Err(GeocodeError::Config(
                "rate_limit.requests_per_second must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        (self.store.timeout_ms > 0).then(|| Duration::from_millis(self.store.timeout_ms))
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            licence: self.service.licence.clone(),
            version: self
                .service
                .version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            enable_details: self.service.enable_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen, "0.0.0.0:3000");
        assert_eq!(config.store.backend, StoreBackend::Elasticsearch);
        assert_eq!(config.store_timeout(), Some(Duration::from_millis(5000)));
        assert!(config.service.enable_details);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
backend = "memory"
fixture = "places.json"
timeout_ms = 0

[service]
licence = "ODbL"
enable_details = false

[rate_limit]
enabled = true
requests_per_second = 5.0
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.fixture, Some(PathBuf::from("places.json")));
        assert_eq!(config.store_timeout(), None);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.service_settings().licence, "ODbL");
        assert!(!config.service_settings().enable_details);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LARCH_LISTEN", "127.0.0.1:8080"),
            ("LARCH_VERSION", "2.0"),
            ("LARCH_LICENCE", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.service_settings().version, "2.0");
        assert_eq!(config.service.licence, DEFAULT_LICENCE);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;
        assert!(matches!(config.validate(), Err(GeocodeError::Config(_))));

        let mut config = Config::default();
        config.store.es_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_backend_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nbackend = \"sqlite\"").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }
}
