// SPDX-License-Identifier: MIT

//! Output events surfaced from an agent thread to its caller (§3 Output
//! event). These are the values pushed onto a thread's [`crate::PushQueue`]
//! as the agent runtime translates ACP session notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of agent output, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputEvent {
    /// Incremental assistant text.
    Text { delta: String },

    /// The agent is blocked on an out-of-band auth step (e.g. an OAuth
    /// device-code flow) and needs the caller to act before it can
    /// continue.
    AuthRequired {
        method: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Vec<String>>,
    },

    /// The agent issued a JSON-RPC request (e.g. `session/request_permission`)
    /// that the caller must answer via `respondToRequest`. `arguments` is the
    /// request's params, JSON-stringified.
    ToolCall {
        request_id: Value,
        method: String,
        arguments: String,
    },

    /// A terminal or recoverable error surfaced from the transport or the
    /// agent itself.
    Error { message: String },
}

impl OutputEvent {
    pub fn text(delta: impl Into<String>) -> Self {
        Self::Text { delta: delta.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// `arguments` is the request's raw params; this stringifies it per the
    /// wire contract (falling back to `"null"` if it somehow can't serialize).
    pub fn tool_call(request_id: Value, method: impl Into<String>, arguments: &Value) -> Self {
        Self::ToolCall {
            request_id,
            method: method.into(),
            arguments: serde_json::to_string(arguments).unwrap_or_else(|_| "null".to_string()),
        }
    }
}
