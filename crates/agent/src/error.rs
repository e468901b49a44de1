// SPDX-License-Identifier: MIT

use thiserror::Error;
use xpod_core::ThreadId;
use xpod_transport::TransportError;

/// Configuration error (§7): missing env/config file, invalid base path,
/// disallowed protocol. Surfaces at the CLI boundary with exit `20`; never
/// thrown once the process is running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("runner protocol {0:?} is not supported; only \"acp\" is accepted")]
    UnsupportedProtocol(String),

    #[error("workspace root path does not exist: {0}")]
    MissingRootPath(std::path::PathBuf),

    #[error("git worktree path escapes the repository: {0}")]
    WorktreeEscapesRepo(std::path::PathBuf),

    #[error("git repository root is not valid: {0}")]
    InvalidGitRoot(std::path::PathBuf),

    #[error("existing worktree path does not exist: {0}")]
    MissingWorktree(std::path::PathBuf),

    #[error("failed to set up isolated environment: {0}")]
    EnvSetup(#[from] std::io::Error),
}

/// Startup error (§7): `ensureStarted` rejects; no thread entry is stored.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn agent process: {0}")]
    Spawn(#[from] TransportError),

    #[error("session/new did not return a session identifier")]
    NoSessionId,

    #[error("initialize request failed: {0}")]
    InitializeRejected(String),

    #[error("session/new request failed: {0}")]
    SessionNewRejected(String),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("no pending tool-call request {request_id} for thread {thread_id}")]
    UnknownPendingRequest {
        thread_id: ThreadId,
        request_id: String,
    },

    #[error("thread {0} has no live entry")]
    UnknownThread(ThreadId),
}
