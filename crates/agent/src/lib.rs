// SPDX-License-Identifier: MIT

//! Per-thread agent runtime: pairs one spawned ACP agent process per
//! conversation thread, negotiates its session, and serializes turns through
//! a job pump (§4.6, §4.7).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod error;
pub mod runtime;
pub mod transport;

pub use error::{ConfigError, RuntimeError, StartupError};
pub use runtime::config::{
    AgentConfig, McpServerConfig, RunnerConfig, RunnerKind, ThreadConfig, Workspace, WorktreeConfig,
    WorktreeMode,
};
pub use runtime::{AgentRuntime, ThreadState};
pub use transport::{AgentTransport, AgentTransportEvent, AgentTransportHandle, PendingAgentRequest};
