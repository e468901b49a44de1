// SPDX-License-Identifier: MIT

//! `xpod.toml` node configuration: the two fixed backends ("content" and
//! "api") the node supervises behind the gateway, plus the public-facing
//! base URL used to pick a bind host (§4.2 C1, §4.4 C5).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default relative path for `--config`, when the flag is omitted.
pub const DEFAULT_CONFIG_FILE: &str = "xpod.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Name of the env var the child reads its assigned port from.
    #[serde(default = "default_port_env")]
    pub port_env: String,
    /// URL prefix the gateway routes to this backend.
    pub route_prefix: String,
}

fn default_port_env() -> String {
    "PORT".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NodeConfig {
    /// The content backend (conventionally a static/CSS-style server).
    /// Absent when `CSS_BASE_URL` points at an already-running instance.
    #[serde(default)]
    pub content: Option<BackendSpec>,
    /// The API backend.
    #[serde(default)]
    pub api: Option<BackendSpec>,
    /// Public base URL the gateway is reachable at; its host selects the
    /// bind address (see `xpod_gateway::bind_host_for`).
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl NodeConfig {
    /// Loads `path` if it exists, else returns an empty config (a node with
    /// no locally-spawned backends is valid — e.g. an all-external setup
    /// driven entirely by `CSS_BASE_URL`).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigLoadError> {
        match std::fs::read_to_string(path) {
            Ok(body) => toml::from_str(&body).map_err(|source| ConfigLoadError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_empty_config() {
        let config = NodeConfig::load_or_default(Path::new("/nonexistent/xpod.toml")).unwrap();
        assert!(config.content.is_none());
        assert!(config.api.is_none());
    }

    #[test]
    fn parses_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xpod.toml");
        std::fs::write(
            &path,
            r#"
            base_url = "http://localhost:4000"

            [content]
            command = "css-server"
            args = ["--port", "0"]
            route_prefix = "/"

            [api]
            command = "api-server"
            route_prefix = "/api"
            "#,
        )
        .unwrap();

        let config = NodeConfig::load_or_default(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.content.unwrap().command, "css-server");
        assert_eq!(config.api.unwrap().route_prefix, "/api");
    }
}
