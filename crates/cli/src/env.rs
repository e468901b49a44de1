// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the CLI crate (§6).
//!
//! `--env <file>` values are read into an [`EnvOverlay`] rather than
//! mutated into the process environment with `std::env::set_var` — that
//! call is unsound to use concurrently with other threads reading the
//! environment (which tokio's runtime does), so every lookup here checks
//! the overlay first and falls back to the real process environment.

use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    values: HashMap<String, String>,
}

impl EnvOverlay {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses `KEY=VALUE` lines from a dotenv-style file. Blank lines and
    /// `#`-prefixed comments are skipped; values may be wrapped in matching
    /// single or double quotes.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let body = std::fs::read_to_string(path)?;
        let mut values = HashMap::new();
        for line in body.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if !key.is_empty() {
                values.insert(key.to_string(), unquote(value.trim()).to_string());
            }
        }
        Ok(Self { values })
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    pub fn port_override(&self) -> Option<u16> {
        self.get("XPOD_PORT")
            .or_else(|| self.get("PORT"))
            .and_then(|s| s.parse().ok())
    }

    pub fn listen_host(&self) -> Option<String> {
        self.get("XPOD_LISTEN_HOST").filter(|s| !s.is_empty())
    }

    /// When set, the content backend is treated as already running at this
    /// URL instead of being spawned as a child process.
    pub fn css_base_url(&self) -> Option<String> {
        self.get("CSS_BASE_URL").filter(|s| !s.is_empty())
    }

    pub fn css_logging_level(&self) -> Option<String> {
        self.get("CSS_LOGGING_LEVEL").filter(|s| !s.is_empty())
    }

    pub fn default_api_key(&self) -> Option<String> {
        self.get("DEFAULT_API_KEY")
    }

    pub fn default_api_base(&self) -> Option<String> {
        self.get("DEFAULT_API_BASE")
    }

    pub fn default_model(&self) -> Option<String> {
        self.get("DEFAULT_MODEL")
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_quoted_and_unquoted_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# comment\nFOO=bar\nBAZ=\"quoted value\"\n\nQUX='single'\n").unwrap();
        let overlay = EnvOverlay::load(&path).unwrap();
        assert_eq!(overlay.get("FOO"), Some("bar".to_string()));
        assert_eq!(overlay.get("BAZ"), Some("quoted value".to_string()));
        assert_eq!(overlay.get("QUX"), Some("single".to_string()));
    }

    #[test]
    fn empty_overlay_falls_back_to_process_env() {
        let overlay = EnvOverlay::empty();
        assert!(overlay.port_override().is_none() || overlay.get("XPOD_PORT").is_some());
    }
}
