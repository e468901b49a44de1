// SPDX-License-Identifier: MIT

//! S4 — session parameters forwarded: a full `AgentConfig` must show up
//! verbatim in the `session/new` params the fixture observes.

use crate::common::thread_config;
use serde_json::json;
use std::collections::HashMap;
use xpod_agent::{AgentConfig, AgentRuntime, McpServerConfig};
use xpod_core::ThreadId;

#[tokio::test]
async fn forwards_full_agent_config_into_session_new() {
    let dump = tempfile::NamedTempFile::new().expect("temp file");
    let dump_path = dump.path().to_string_lossy().to_string();

    let mut mcp_servers = HashMap::new();
    mcp_servers.insert(
        "fs".to_string(),
        McpServerConfig {
            kind: "stdio".to_string(),
            command: Some("mcp-fs".to_string()),
            args: vec!["--root".to_string(), "/tmp".to_string()],
            extra: Default::default(),
        },
    );

    let agent_config = AgentConfig {
        api_key: Some("sk-test".to_string()),
        api_base: None,
        model: Some("test-model".to_string()),
        system_prompt: Some("be terse".to_string()),
        skills_content: Some("extra skill".to_string()),
        max_turns: Some(12),
        allowed_tools: Some(vec!["fs.read".to_string()]),
        disallowed_tools: Some(vec!["fs.write".to_string()]),
        permission_mode: Some("auto".to_string()),
        mcp_servers,
    };

    let runtime = AgentRuntime::new();
    let thread_id = ThreadId::new("s4-session-params");
    let config = thread_config("S4", Some(dump_path.as_str()), Some(agent_config));

    runtime
        .ensure_started(thread_id.clone(), config)
        .await
        .expect("agent should start");

    let observed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump_path).expect("fixture should dump params"))
            .expect("dumped params should be valid JSON");

    assert_eq!(observed["systemPrompt"], json!("be terse"));
    assert_eq!(observed["appendSystemPrompt"], json!("extra skill"));
    assert_eq!(observed["maxTurns"], json!(12));
    assert_eq!(observed["allowedTools"], json!(["fs.read"]));
    assert_eq!(observed["disallowedTools"], json!(["fs.write"]));
    assert_eq!(observed["permissionMode"], json!("auto"));
    assert_eq!(
        observed["mcpServers"],
        json!([{ "name": "fs", "type": "stdio", "command": "mcp-fs", "args": ["--root", "/tmp"] }])
    );
}
