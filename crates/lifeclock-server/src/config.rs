//! Relay configuration.
//!
//! Precedence, lowest first: built-in defaults, the optional TOML file,
//! environment variables, command-line flags.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use lifeclock_core::dream::upstream::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ServerError;

pub const ENV_BIND: &str = "LIFECLOCK_BIND";
pub const ENV_UPSTREAM_URL: &str = "LIFECLOCK_UPSTREAM_URL";
pub const ENV_MODEL: &str = "LIFECLOCK_MODEL";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub upstream_url: String,
    pub model: String,
    /// Kept out of files in practice; normally supplied via `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
    pub upstream_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            rate_limit_max: 10,
            rate_limit_window_secs: 15 * 60,
            upstream_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ServerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind
                .parse()
                .map_err(|e| ServerError::invalid(ENV_BIND, format!("{bind}: {e}")))?;
        }
        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            self.upstream_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        Url::parse(&self.upstream_url)
            .map_err(|e| ServerError::invalid("upstream_url", format!("{}: {e}", self.upstream_url)))?;
        if self.model.trim().is_empty() {
            return Err(ServerError::invalid("model", "must not be empty"));
        }
        if self.rate_limit_max == 0 {
            return Err(ServerError::invalid("rate_limit_max", "must be at least 1"));
        }
        if self.rate_limit_window_secs == 0 {
            return Err(ServerError::invalid("rate_limit_window_secs", "must be at least 1"));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ServerError::invalid("upstream_timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.rate_limit_window(), Duration::from_secs(900));
        config.validate().unwrap();
    }

    #[test]
    fn file_overlays_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "bind = \"0.0.0.0:8080\"\nrate_limit_max = 3\n").unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.rate_limit_max, 3);
        assert_eq!(config.upstream_timeout_secs, 30);
    }

    #[test]
    fn bad_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "bind = 42").unwrap();
        let err = ServerConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("server.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_BIND, "127.0.0.1:4000"),
            (ENV_MODEL, "gpt-4o-mini"),
            (ENV_API_KEY, "sk-env"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind.port(), 4000);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.upstream_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn invalid_env_bind_is_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(|k| (k == ENV_BIND).then(|| "nowhere".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_BIND));
    }

    #[test]
    fn validate_rejects_bad_upstream_url() {
        let config = ServerConfig {
            upstream_url: "::not a url".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
