// SPDX-License-Identifier: MIT

//! JSON-RPC 2.0 message shapes carried over the line-delimited transport
//! (§4.2 C2). A line is classified by which fields are present, not by a
//! discriminant tag: `method` + `id` is a request, `method` with no `id` is
//! a notification, and `id` with `result`/`error` and no `method` is a
//! response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingRequest {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingRequest {
    pub fn new(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl OutgoingResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Result { result },
        }
    }

    pub fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Error {
                error: RpcError {
                    code,
                    message: message.into(),
                    data: None,
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponsePayload {
    Result { result: Value },
    Error { error: RpcError },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Well-known JSON-RPC error codes used when xpod answers requests it can't
/// route anywhere (§7).
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INTERNAL_ERROR: i64 = -32603;
pub const PARSE_ERROR: i64 = -32700;

/// A decoded line from the child's stdout, classified per the field-presence
/// rule above.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    Request {
        id: Value,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    Response {
        id: Value,
        payload: ResponsePayload,
    },
}

impl IncomingMessage {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        let method = value.get("method").and_then(Value::as_str).map(str::to_string);
        let id = value.get("id").cloned();
        let params = value.get("params").cloned();

        if let Some(method) = method {
            match id {
                Some(id) => Ok(IncomingMessage::Request { id, method, params }),
                None => Ok(IncomingMessage::Notification { method, params }),
            }
        } else {
            let id = id.unwrap_or(Value::Null);
            let payload = if let Some(error) = value.get("error").cloned() {
                ResponsePayload::Error {
                    error: serde_json::from_value(error)?,
                }
            } else {
                ResponsePayload::Result {
                    result: value.get("result").cloned().unwrap_or(Value::Null),
                }
            };
            Ok(IncomingMessage::Response { id, payload })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_request_by_id_and_method() {
        let line = r#"{"jsonrpc":"2.0","id":1,"method":"session/new","params":{}}"#;
        match IncomingMessage::parse(line).unwrap() {
            IncomingMessage::Request { id, method, .. } => {
                assert_eq!(id, Value::from(1));
                assert_eq!(method, "session/new");
            }
            other => panic!("expected Request, got {other:?}"),
        }
    }

    #[test]
    fn classifies_notification_by_missing_id() {
        let line = r#"{"jsonrpc":"2.0","method":"session/update","params":{"delta":"hi"}}"#;
        match IncomingMessage::parse(line).unwrap() {
            IncomingMessage::Notification { method, .. } => assert_eq!(method, "session/update"),
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn classifies_response_by_missing_method() {
        let line = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
        match IncomingMessage::parse(line).unwrap() {
            IncomingMessage::Response { id, payload } => {
                assert_eq!(id, Value::from(1));
                assert_eq!(payload, ResponsePayload::Result { result: serde_json::json!({"ok": true}) });
            }
            other => panic!("expected Response, got {other:?}"),
        }
    }

    #[test]
    fn classifies_error_response() {
        let line = r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"nope"}}"#;
        match IncomingMessage::parse(line).unwrap() {
            IncomingMessage::Response {
                payload: ResponsePayload::Error { error },
                ..
            } => assert_eq!(error.code, -32601),
            other => panic!("expected error Response, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(IncomingMessage::parse("not json").is_err());
    }
}
