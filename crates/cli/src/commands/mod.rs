// SPDX-License-Identifier: MIT

pub mod health;
pub mod run;
pub mod status;
pub mod stop;

use crate::config::DEFAULT_CONFIG_FILE;
use std::path::{Path, PathBuf};
use xpod_core::RuntimeRecordStore;

/// Resolves the project root a record-backed command operates against.
pub fn project_root(explicit: Option<&Path>) -> std::io::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => std::env::current_dir(),
    }
}

pub fn record_store_and_key(
    project_root: &Path,
    env_path: Option<&Path>,
) -> (RuntimeRecordStore, String) {
    let store = RuntimeRecordStore::new(project_root);
    let key = RuntimeRecordStore::key_for_env_path(env_path);
    (store, key)
}

pub fn default_config_path(project_root: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_root.join(DEFAULT_CONFIG_FILE))
}
