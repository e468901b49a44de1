// SPDX-License-Identifier: MIT

//! On-disk runtime record (§3 Runtime record, §6 `.xpod/runtime/<key>.json`)
//! — the handshake between a running `xpod run` process and later `xpod
//! status`/`xpod stop` invocations against the same project.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeRecord {
    pub pid: u32,
    pub mode: String,
    pub port: u16,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_path: Option<String>,
    pub config_path: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub schema_version: String,
}

impl RuntimeRecord {
    pub fn new(
        pid: u32,
        mode: impl Into<String>,
        port: u16,
        base_url: impl Into<String>,
        config_path: impl Into<String>,
        start_time: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            pid,
            mode: mode.into(),
            port,
            base_url: base_url.into(),
            public_url: None,
            env_path: None,
            config_path: config_path.into(),
            start_time,
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeRecordError {
    #[error("failed to create runtime record directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to write runtime record {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to read runtime record {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to remove runtime record {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
    #[error("malformed runtime record {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads and writes [`RuntimeRecord`] files under `<project_root>/.xpod/runtime/`.
///
/// Keyed by the env file in use, so multiple `xpod run` invocations against
/// different `--env-file`s in the same project don't clobber each other.
pub struct RuntimeRecordStore {
    project_root: PathBuf,
}

impl RuntimeRecordStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Derives the storage key from an absolute env-file path, or `"default"`
    /// when no env file was given.
    pub fn key_for_env_path(env_path: Option<&Path>) -> String {
        match env_path {
            Some(path) => {
                let mut hasher = Sha256::new();
                hasher.update(path.to_string_lossy().as_bytes());
                let digest = hasher.finalize();
                hex::encode(digest)[..12].to_string()
            }
            None => "default".to_string(),
        }
    }

    fn runtime_dir(&self) -> PathBuf {
        self.project_root.join(".xpod").join("runtime")
    }

    fn path_for_key(&self, key: &str) -> PathBuf {
        self.runtime_dir().join(format!("{key}.json"))
    }

    pub fn save(&self, key: &str, record: &RuntimeRecord) -> Result<(), RuntimeRecordError> {
        let dir = self.runtime_dir();
        std::fs::create_dir_all(&dir).map_err(|source| RuntimeRecordError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        let path = self.path_for_key(key);
        let body = serde_json::to_vec_pretty(record).map_err(|source| {
            RuntimeRecordError::Decode {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, body).map_err(|source| RuntimeRecordError::Write {
            path: path.clone(),
            source,
        })
    }

    pub fn load(&self, key: &str) -> Result<Option<RuntimeRecord>, RuntimeRecordError> {
        let path = self.path_for_key(key);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|source| {
                    RuntimeRecordError::Decode {
                        path: path.clone(),
                        source,
                    }
                })?;
                Ok(Some(record))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RuntimeRecordError::Read { path, source }),
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), RuntimeRecordError> {
        let path = self.path_for_key(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RuntimeRecordError::Remove { path, source }),
        }
    }

    /// Lists every record currently stored for this project, skipping files
    /// that fail to parse rather than aborting the whole scan.
    pub fn list(&self) -> Result<Vec<RuntimeRecord>, RuntimeRecordError> {
        let dir = self.runtime_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RuntimeRecordError::Read {
                    path: dir,
                    source,
                })
            }
        };
        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Ok(bytes) = std::fs::read(&path) {
                if let Ok(record) = serde_json::from_slice(&bytes) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn default_key_is_used_without_env_path() {
        assert_eq!(RuntimeRecordStore::key_for_env_path(None), "default");
    }

    #[test]
    fn env_path_key_is_deterministic_and_short() {
        let path = Path::new("/project/.env.local");
        let key_a = RuntimeRecordStore::key_for_env_path(Some(path));
        let key_b = RuntimeRecordStore::key_for_env_path(Some(path));
        assert_eq!(key_a, key_b);
        assert_eq!(key_a.len(), 12);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuntimeRecordStore::new(dir.path());
        let record = RuntimeRecord::new(123, "local", 4123, "http://127.0.0.1:4123", "xpod.toml", Utc::now());
        store.save("default", &record).unwrap();
        let loaded = store.load("default").unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn load_missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuntimeRecordStore::new(dir.path());
        assert_eq!(store.load("missing").unwrap(), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = RuntimeRecordStore::new(dir.path());
        store.remove("default").unwrap();
        let record = RuntimeRecord::new(1, "local", 4000, "http://127.0.0.1:4000", "xpod.toml", Utc::now());
        store.save("default", &record).unwrap();
        store.remove("default").unwrap();
        assert_eq!(store.load("default").unwrap(), None);
    }
}
