// SPDX-License-Identifier: MIT

//! Working-directory resolution (§4.7.6): a plain path workspace resolves to
//! itself; a git workspace resolves to a worktree, reused if present or
//! created fresh under `<repoRoot>/<rootDirName>/<threadId>`.

use crate::error::ConfigError;
use crate::runtime::config::{Workspace, WorktreeConfig, WorktreeMode};
use std::path::{Path, PathBuf};
use xpod_core::ThreadId;

/// Resolves the working directory a thread's agent process should be
/// spawned in. Does not spawn `git` itself when the worktree already
/// exists — only `create` mode shells out.
pub async fn resolve_workdir(
    workspace: &Workspace,
    thread_id: &ThreadId,
) -> Result<PathBuf, ConfigError> {
    match workspace {
        Workspace::Path { root_path } => {
            if !tokio::fs::try_exists(root_path).await.unwrap_or(false) {
                return Err(ConfigError::MissingRootPath(root_path.clone()));
            }
            Ok(root_path.clone())
        }
        Workspace::Git { root_path, worktree } => {
            if !is_git_root(root_path).await {
                return Err(ConfigError::InvalidGitRoot(root_path.clone()));
            }
            resolve_git_worktree(root_path, worktree, thread_id).await
        }
    }
}

async fn is_git_root(root_path: &Path) -> bool {
    tokio::fs::try_exists(root_path.join(".git")).await.unwrap_or(false)
}

async fn resolve_git_worktree(
    root_path: &Path,
    worktree: &WorktreeConfig,
    thread_id: &ThreadId,
) -> Result<PathBuf, ConfigError> {
    match worktree.mode {
        WorktreeMode::Existing => {
            let path = worktree
                .path
                .clone()
                .unwrap_or_else(|| default_worktree_path(root_path, worktree, thread_id));
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ConfigError::MissingWorktree(path));
            }
            ensure_within_root(root_path, &path)?;
            Ok(path)
        }
        WorktreeMode::Create => {
            let path = worktree
                .path
                .clone()
                .unwrap_or_else(|| default_worktree_path(root_path, worktree, thread_id));
            ensure_within_root(root_path, &path)?;
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Ok(path);
            }
            create_worktree(root_path, &path, worktree).await?;
            Ok(path)
        }
    }
}

fn default_worktree_path(root_path: &Path, worktree: &WorktreeConfig, thread_id: &ThreadId) -> PathBuf {
    root_path.join(&worktree.root_dir_name).join(thread_id.as_str())
}

/// Rejects any resolved worktree path that would land outside the repo,
/// whether via an absolute override or `..` traversal in `rootDirName`.
fn ensure_within_root(root_path: &Path, candidate: &Path) -> Result<(), ConfigError> {
    let root = normalize(root_path);
    let candidate_normalized = normalize(candidate);
    if candidate_normalized.starts_with(&root) {
        Ok(())
    } else {
        Err(ConfigError::WorktreeEscapesRepo(candidate.to_path_buf()))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                out.pop();
            }
            std::path::Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

async fn create_worktree(
    root_path: &Path,
    target: &Path,
    worktree: &WorktreeConfig,
) -> Result<(), ConfigError> {
    if let Some(parent) = target.parent() {
        let _ = tokio::fs::create_dir_all(parent).await;
    }
    let mut command = tokio::process::Command::new("git");
    command.current_dir(root_path).arg("worktree").arg("add");
    if let Some(branch) = &worktree.branch {
        command.arg("-b").arg(branch);
    }
    command.arg(target);
    if worktree.branch.is_none() {
        command.arg(&worktree.base_ref);
    }
    let status = command
        .status()
        .await
        .map_err(|_| ConfigError::InvalidGitRoot(root_path.to_path_buf()))?;
    if !status.success() {
        return Err(ConfigError::InvalidGitRoot(root_path.to_path_buf()));
    }
    Ok(())
}
