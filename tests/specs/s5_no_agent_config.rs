// SPDX-License-Identifier: MIT

//! S5 — no agent config: without an `AgentConfig`, `session/new` must carry
//! an empty `mcpServers` array and omit every optional session field.

use crate::common::thread_config;
use xpod_agent::AgentRuntime;
use xpod_core::ThreadId;

#[tokio::test]
async fn omits_optional_fields_when_agent_config_absent() {
    let dump = tempfile::NamedTempFile::new().expect("temp file");
    let dump_path = dump.path().to_string_lossy().to_string();

    let runtime = AgentRuntime::new();
    let thread_id = ThreadId::new("s5-no-agent-config");
    let config = thread_config("S5", Some(dump_path.as_str()), None);

    runtime
        .ensure_started(thread_id.clone(), config)
        .await
        .expect("agent should start");

    let observed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&dump_path).expect("fixture should dump params"))
            .expect("dumped params should be valid JSON");

    assert_eq!(observed["mcpServers"], serde_json::json!([]));
    for absent in [
        "systemPrompt",
        "appendSystemPrompt",
        "maxTurns",
        "allowedTools",
        "disallowedTools",
        "permissionMode",
    ] {
        assert!(observed.get(absent).is_none(), "{absent} should be absent, got {observed}");
    }
}
