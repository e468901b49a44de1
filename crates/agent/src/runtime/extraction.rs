// SPDX-License-Identifier: MIT

//! Text-delta extraction (§4.7.8): pulls a plain-text increment out of a
//! `session/update` notification's `update` payload. Agents disagree on the
//! exact shape, so the rules below are tried in order and the first match
//! wins.

use serde_json::Value;

/// Attempts to pull a text delta out of one `session/update` notification's
/// `update` field. Returns `None` when the update carries no recognizable
/// text (e.g. a tool-call-only update).
pub fn extract_text_delta(update: &Value) -> Option<String> {
    if let Value::String(s) = update {
        return Some(s.clone());
    }

    if let Some(delta) = update.get("delta").and_then(Value::as_str) {
        return Some(delta.to_string());
    }
    if let Some(text) = update.get("text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    if let Some(content) = update.get("content") {
        if let Some(s) = content.as_str() {
            return Some(s.to_string());
        }
        if let Some(text) = content.get("text").and_then(Value::as_str) {
            return Some(text.to_string());
        }
        if let Some(nested) = content.get("content").and_then(Value::as_str) {
            return Some(nested.to_string());
        }
        if let Some(parts) = content.as_array() {
            let mut combined = String::new();
            let mut matched = false;
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    combined.push_str(text);
                    matched = true;
                }
            }
            if matched {
                return Some(combined);
            }
        }
    }

    for key in ["message", "item", "assistant_message"] {
        if let Some(nested) = update.get(key) {
            if let Some(delta) = extract_text_delta(nested) {
                return Some(delta);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_itself_may_be_a_string() {
        assert_eq!(extract_text_delta(&json!("hello")), Some("hello".to_string()));
    }

    #[test]
    fn delta_field_wins_first() {
        assert_eq!(
            extract_text_delta(&json!({ "delta": "a", "text": "b" })),
            Some("a".to_string())
        );
    }

    #[test]
    fn text_field_used_when_no_delta() {
        assert_eq!(extract_text_delta(&json!({ "text": "b" })), Some("b".to_string()));
    }

    #[test]
    fn content_string_is_used() {
        assert_eq!(extract_text_delta(&json!({ "content": "c" })), Some("c".to_string()));
    }

    #[test]
    fn nested_content_content_is_used() {
        assert_eq!(
            extract_text_delta(&json!({ "content": { "content": "d" } })),
            Some("d".to_string())
        );
    }

    #[test]
    fn content_block_object_with_text_field_is_used() {
        assert_eq!(
            extract_text_delta(&json!({ "content": { "type": "text", "text": "chunk" } })),
            Some("chunk".to_string())
        );
    }

    #[test]
    fn content_block_array_concatenates_text_parts() {
        assert_eq!(
            extract_text_delta(&json!({
                "content": [
                    { "type": "text", "text": "hello " },
                    { "type": "text", "text": "world" },
                ]
            })),
            Some("hello world".to_string())
        );
    }

    #[test]
    fn nested_message_is_recursed_into() {
        assert_eq!(
            extract_text_delta(&json!({ "message": { "text": "e" } })),
            Some("e".to_string())
        );
    }

    #[test]
    fn tool_call_only_update_yields_none() {
        assert_eq!(extract_text_delta(&json!({ "toolCall": { "name": "x" } })), None);
    }
}
