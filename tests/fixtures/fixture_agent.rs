// SPDX-License-Identifier: MIT

//! Deterministic ACP-speaking fixture agent used to drive scenarios S1-S6
//! without a real coding agent. Scenario is selected by the first argv
//! entry; for scenarios that need to assert on what `xpod` sent, the second
//! argv entry is a path the observed `session/new` params get dumped to as
//! JSON.

use serde_json::{json, Value};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let scenario = args.next().unwrap_or_else(|| "S1".to_string());
    let dump_path = args.next();
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let message: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");
        let id = message.get("id").cloned();

        match method {
            "initialize" => {
                write_response(&mut stdout, id, json!({ "protocolVersion": 1, "agentCapabilities": {}, "authMethods": [] })).await;
            }
            "session/new" => {
                dump_params(dump_path.as_deref(), message.get("params"));
                write_response(&mut stdout, id, json!({ "sessionId": "fixture-session" })).await;
            }
            "session/prompt" => {
                run_scenario(&scenario, &mut stdout, id).await;
            }
            _ => {}
        }
    }
}

async fn run_scenario(scenario: &str, stdout: &mut tokio::io::Stdout, prompt_id: Option<Value>) {
    match scenario {
        "S1" => {
            notify_update(stdout, "echo:").await;
            notify_update(stdout, "hello").await;
            write_response(stdout, prompt_id, json!({})).await;
        }
        "S2" => {
            request(stdout, "auth/request", json!({ "url": "https://example.com/login" })).await;
            notify_update(stdout, "ok").await;
            write_response(stdout, prompt_id, json!({})).await;
        }
        "S3" => {
            request_with_id(stdout, 7, "fs.read", json!({ "path": "/tmp/a" })).await;
            write_response(stdout, prompt_id, json!({})).await;
        }
        // S4/S5 only care about the dumped `session/new` params; the prompt
        // turn itself carries nothing interesting.
        "S4" | "S5" | _ => {
            write_response(stdout, prompt_id, json!({})).await;
        }
    }
}

async fn notify_update(stdout: &mut tokio::io::Stdout, delta: &str) {
    write_line(
        stdout,
        json!({
            "jsonrpc": "2.0",
            "method": "session/update",
            "params": { "sessionId": "fixture-session", "update": { "delta": delta } },
        }),
    )
    .await;
}

async fn request(stdout: &mut tokio::io::Stdout, method: &str, params: Value) {
    write_line(stdout, json!({ "jsonrpc": "2.0", "id": 1000, "method": method, "params": params })).await;
}

async fn request_with_id(stdout: &mut tokio::io::Stdout, id: u64, method: &str, params: Value) {
    write_line(stdout, json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })).await;
}

async fn write_response(stdout: &mut tokio::io::Stdout, id: Option<Value>, result: Value) {
    write_line(stdout, json!({ "jsonrpc": "2.0", "id": id, "result": result })).await;
}

async fn write_line(stdout: &mut tokio::io::Stdout, value: Value) {
    let mut body = serde_json::to_string(&value).unwrap_or_default();
    body.push('\n');
    let _ = stdout.write_all(body.as_bytes()).await;
    let _ = stdout.flush().await;
}

fn dump_params(path: Option<&str>, params: Option<&Value>) {
    let Some(path) = path else {
        return;
    };
    if let Ok(mut file) = std::fs::File::create(path) {
        let body = params.cloned().unwrap_or(Value::Null);
        let _ = file.write_all(serde_json::to_string(&body).unwrap_or_default().as_bytes());
    }
}
