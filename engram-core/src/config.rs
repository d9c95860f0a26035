//! Runtime configuration, constructed once at startup and passed
//! explicitly. Environment variables are only read here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::{ConfigError, EngramResult};

/// Which backend implementation serves the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process store, zero infrastructure.
    Embedded,
    /// Bolt connection to a running graph server.
    Remote,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Embedded => "embedded",
            BackendKind::Remote => "remote",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Graph backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Forced backend, if `GRAPH_BACKEND` was set.
    pub forced_backend: Option<BackendKind>,
    /// Bolt URI for the remote backend.
    pub uri: String,
    /// Remote username.
    pub user: String,
    /// Remote password. Required when the remote backend is forced.
    pub password: Option<String>,
    /// Remote bolt port (used for reachability probes).
    pub bolt_port: u16,
    /// Remote http port.
    pub http_port: u16,
    /// Remote heap size hint (e.g. "2G").
    pub heap_size: String,
    /// Remote page cache size hint (e.g. "1G").
    pub page_cache_size: String,
    /// Seconds to wait for remote readiness at startup.
    pub startup_timeout_secs: u64,
    /// Project id override, if `AMPLIHACK_PROJECT_ID` was set.
    pub project_id: Option<String>,
    /// On-disk location of the embedded store.
    pub embedded_path: PathBuf,
    /// On-disk external-knowledge cache directory.
    pub cache_dir: PathBuf,
    /// Maximum retry attempts for transient failures.
    pub max_retries: u32,
    /// Hard timeout for health probes.
    pub probe_timeout: Duration,
    /// Hard timeout for write operations.
    pub write_timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            forced_backend: None,
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
            bolt_port: 7687,
            http_port: 7474,
            heap_size: "2G".to_string(),
            page_cache_size: "1G".to_string(),
            startup_timeout_secs: 30,
            project_id: None,
            embedded_path: home.join(".engram").join("graph.db"),
            cache_dir: home.join(".engram").join("knowledge_cache"),
            max_retries: constants::MAX_RETRIES,
            probe_timeout: Duration::from_millis(constants::PROBE_TIMEOUT_MS),
            write_timeout: Duration::from_millis(constants::WRITE_TIMEOUT_MS),
        }
    }
}

impl GraphConfig {
    /// Build configuration from the process environment.
    ///
    /// Fails with [`ConfigError`] when a variable is present but invalid,
    /// or when the remote backend is forced without a password.
    pub fn from_env() -> EngramResult<Self> {
        let mut config = Self::default();

        if let Some(value) = read_var("GRAPH_BACKEND") {
            config.forced_backend = Some(match value.to_ascii_lowercase().as_str() {
                "embedded" => BackendKind::Embedded,
                "remote" => BackendKind::Remote,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "GRAPH_BACKEND".to_string(),
                        value,
                    }
                    .into())
                }
            });
        }

        if let Some(uri) = read_var("GRAPH_URI") {
            config.uri = uri;
        }
        if let Some(user) = read_var("GRAPH_USER") {
            config.user = user;
        }
        config.password = read_var("GRAPH_PASSWORD");

        if let Some(port) = read_var("GRAPH_BOLT_PORT") {
            config.bolt_port = parse_var("GRAPH_BOLT_PORT", &port)?;
        }
        if let Some(port) = read_var("GRAPH_HTTP_PORT") {
            config.http_port = parse_var("GRAPH_HTTP_PORT", &port)?;
        }
        if let Some(heap) = read_var("GRAPH_HEAP_SIZE") {
            config.heap_size = heap;
        }
        if let Some(cache) = read_var("GRAPH_PAGE_CACHE_SIZE") {
            config.page_cache_size = cache;
        }
        if let Some(timeout) = read_var("GRAPH_STARTUP_TIMEOUT") {
            config.startup_timeout_secs = parse_var("GRAPH_STARTUP_TIMEOUT", &timeout)?;
        }
        config.project_id = read_var("AMPLIHACK_PROJECT_ID");

        if config.forced_backend == Some(BackendKind::Remote) && config.password.is_none() {
            return Err(ConfigError::MissingVar {
                name: "GRAPH_PASSWORD".to_string(),
            }
            .into());
        }

        Ok(config)
    }

    /// Host portion of the bolt URI, for reachability probes.
    pub fn bolt_host(&self) -> String {
        let stripped = self
            .uri
            .split("://")
            .nth(1)
            .unwrap_or(self.uri.as_str());
        stripped
            .split(':')
            .next()
            .unwrap_or("localhost")
            .to_string()
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> EngramResult<T> {
    value.parse().map_err(|_| {
        ConfigError::InvalidVar {
            name: name.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GraphConfig::default();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.user, "neo4j");
        assert_eq!(config.bolt_port, 7687);
        assert_eq!(config.http_port, 7474);
        assert_eq!(config.startup_timeout_secs, 30);
        assert!(config.forced_backend.is_none());
    }

    #[test]
    fn bolt_host_strips_scheme_and_port() {
        let mut config = GraphConfig::default();
        config.uri = "bolt://db.internal:7687".to_string();
        assert_eq!(config.bolt_host(), "db.internal");
    }
}
