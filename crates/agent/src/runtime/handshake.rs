// SPDX-License-Identifier: MIT

//! Session handshake (§4.7.4): `initialize` then `session/new`, run once per
//! `ensureStarted` before any `session/prompt` is issued.

use crate::error::StartupError;
use crate::runtime::config::{AgentConfig, McpServerConfig};
use crate::transport::AgentTransport;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use xpod_transport::message::ResponsePayload;

const PROTOCOL_VERSION: u64 = 1;
const CLIENT_NAME: &str = "xpod";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn initialize(transport: &AgentTransport) -> Result<(), StartupError> {
    let params = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "clientCapabilities": {},
        "clientInfo": { "name": CLIENT_NAME, "version": CLIENT_VERSION },
    });
    match transport.request("initialize", Some(params)).await {
        Ok(ResponsePayload::Result { .. }) => Ok(()),
        Ok(ResponsePayload::Error { error }) => Err(StartupError::InitializeRejected(error.message)),
        Err(source) => Err(StartupError::Spawn(source)),
    }
}

/// Issues `session/new` and extracts the agent-assigned session id from the
/// response. Accepts either a bare string result or an object carrying
/// `sessionId`.
pub async fn new_session(
    transport: &AgentTransport,
    cwd: &Path,
    agent_config: Option<&AgentConfig>,
) -> Result<String, StartupError> {
    let mut params = json!({
        "cwd": cwd.to_string_lossy(),
        "mcpServers": mcp_servers_param(agent_config),
    });
    if let Some(config) = agent_config {
        let object = params.as_object_mut().expect("object literal");
        if let Some(prompt) = &config.system_prompt {
            object.insert("systemPrompt".to_string(), json!(prompt));
        }
        if let Some(skills) = &config.skills_content {
            object.insert("appendSystemPrompt".to_string(), json!(skills));
        }
        if let Some(max_turns) = config.max_turns {
            object.insert("maxTurns".to_string(), json!(max_turns));
        }
        if let Some(allowed) = &config.allowed_tools {
            object.insert("allowedTools".to_string(), json!(allowed));
        }
        if let Some(disallowed) = &config.disallowed_tools {
            object.insert("disallowedTools".to_string(), json!(disallowed));
        }
        if let Some(mode) = &config.permission_mode {
            object.insert("permissionMode".to_string(), json!(mode));
        }
    }

    match transport.request("session/new", Some(params)).await {
        Ok(ResponsePayload::Result { result }) => {
            extract_session_id(&result).ok_or(StartupError::NoSessionId)
        }
        Ok(ResponsePayload::Error { error }) => Err(StartupError::SessionNewRejected(error.message)),
        Err(source) => Err(StartupError::Spawn(source)),
    }
}

fn mcp_servers_param(agent_config: Option<&AgentConfig>) -> Value {
    let servers: &HashMap<String, McpServerConfig> = match agent_config {
        Some(config) => &config.mcp_servers,
        None => return Value::Array(Vec::new()),
    };
    let mut out: Vec<Value> = Vec::with_capacity(servers.len());
    for (name, server) in servers {
        let mut entry = serde_json::to_value(server).unwrap_or(Value::Null);
        if let Some(object) = entry.as_object_mut() {
            object.insert("name".to_string(), json!(name));
        }
        out.push(entry);
    }
    Value::Array(out)
}

fn extract_session_id(result: &Value) -> Option<String> {
    match result {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map
            .get("sessionId")
            .or_else(|| map.get("session_id"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_session_id_from_bare_string() {
        assert_eq!(extract_session_id(&json!("abc")), Some("abc".to_string()));
    }

    #[test]
    fn extracts_session_id_from_object() {
        assert_eq!(
            extract_session_id(&json!({ "sessionId": "abc" })),
            Some("abc".to_string())
        );
    }

    #[test]
    fn missing_session_id_is_none() {
        assert_eq!(extract_session_id(&json!({ "ok": true })), None);
    }

    #[test]
    fn mcp_servers_param_defaults_empty_array() {
        assert_eq!(mcp_servers_param(None), json!([]));
    }

    #[test]
    fn mcp_servers_param_folds_name_into_each_entry() {
        let mut servers = HashMap::new();
        servers.insert(
            "fs".to_string(),
            McpServerConfig {
                kind: "stdio".to_string(),
                command: Some("mcp-fs".to_string()),
                args: vec![],
                extra: HashMap::new(),
            },
        );
        let config = AgentConfig {
            mcp_servers: servers,
            ..Default::default()
        };
        let value = mcp_servers_param(Some(&config));
        let array = value.as_array().expect("array");
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["name"], json!("fs"));
        assert_eq!(array[0]["type"], json!("stdio"));
        assert_eq!(array[0]["command"], json!("mcp-fs"));
    }
}
