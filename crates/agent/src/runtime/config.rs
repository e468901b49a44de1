// SPDX-License-Identifier: MIT

//! Configuration contract (§4.7.3): the nested `cfg` object passed to
//! `ensureStarted`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    Codebuddy,
    Claude,
    Codex,
}

impl RunnerKind {
    /// Default argv, resolved first against a local binaries directory
    /// adjacent to the project, falling through to `PATH` (§6).
    pub fn default_argv(self) -> (&'static str, Vec<&'static str>) {
        match self {
            RunnerKind::Codebuddy => ("codebuddy", vec!["--acp"]),
            RunnerKind::Claude => ("claude-code-acp", vec![]),
            RunnerKind::Codex => ("codex-acp", vec![]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorktreeConfig {
    #[serde(default = "default_worktree_mode")]
    pub mode: WorktreeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_base_ref")]
    pub base_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default = "default_worktree_root_dir_name")]
    pub root_dir_name: String,
}

fn default_base_ref() -> String {
    "main".to_string()
}

fn default_worktree_root_dir_name() -> String {
    ".xpod-worktrees".to_string()
}

fn default_worktree_mode() -> WorktreeMode {
    WorktreeMode::Create
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorktreeMode {
    Existing,
    #[default]
    Create,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Workspace {
    Path { root_path: PathBuf },
    Git { root_path: PathBuf, worktree: WorktreeConfig },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(rename = "type")]
    pub kind: RunnerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argv: Option<Vec<String>>,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "acp".to_string()
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "acp" {
            return Err(ConfigError::UnsupportedProtocol(self.protocol.clone()));
        }
        Ok(())
    }

    /// Resolves the argv to actually spawn: caller override, else the
    /// runner kind's default command.
    pub fn resolved_argv(&self) -> Vec<String> {
        if let Some(argv) = &self.argv {
            return argv.clone();
        }
        let (command, args) = self.kind.default_argv();
        let mut out = vec![command.to_string()];
        out.extend(args.into_iter().map(str::to_string));
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServerConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Credentials and session-parameter overlay (§4.7.5, §4.7.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallowed_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub mcp_servers: HashMap<String, McpServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadConfig {
    pub workspace: Workspace,
    pub runner: RunnerConfig,
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
    #[serde(default = "default_auth_wait_ms")]
    pub auth_wait_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_config: Option<AgentConfig>,
}

fn default_idle_ms() -> u64 {
    500
}

fn default_auth_wait_ms() -> u64 {
    300_000
}

impl ThreadConfig {
    /// `authWaitMs` is floored to `idleMs` per §4.7.3.
    pub fn effective_auth_wait_ms(&self) -> u64 {
        self.auth_wait_ms.max(self.idle_ms)
    }
}
