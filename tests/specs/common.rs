// SPDX-License-Identifier: MIT

//! Shared helpers for the black-box agent-runtime scenarios (S1-S6).

use std::path::PathBuf;
use xpod_agent::{AgentConfig, RunnerConfig, RunnerKind, ThreadConfig, Workspace};

/// Path to the compiled fixture agent binary, via the same
/// cargo-metadata-driven lookup `assert_cmd` uses elsewhere in this suite.
pub fn fixture_agent_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin("xpod-fixture-agent")
}

/// Builds a `ThreadConfig` whose runner is the fixture agent invoked with
/// `scenario` (and, if given, a path the fixture dumps observed
/// `session/new` params to).
pub fn thread_config(scenario: &str, dump_path: Option<&str>, agent_config: Option<AgentConfig>) -> ThreadConfig {
    let workdir = std::env::temp_dir();
    let mut argv = vec![fixture_agent_path().to_string_lossy().to_string(), scenario.to_string()];
    if let Some(path) = dump_path {
        argv.push(path.to_string());
    }

    ThreadConfig {
        workspace: Workspace::Path { root_path: workdir },
        runner: RunnerConfig {
            kind: RunnerKind::Codebuddy,
            argv: Some(argv),
            protocol: "acp".to_string(),
        },
        idle_ms: 50,
        auth_wait_ms: 300_000,
        agent_config,
    }
}
