// SPDX-License-Identifier: MIT

//! S3 — tool-call bridging: an unrecognized agent request surfaces as a
//! `ToolCall` event and ends that turn's stream immediately (the caller
//! must answer on a fresh stream via `respondToRequest`).

use crate::common::thread_config;
use xpod_agent::AgentRuntime;
use xpod_core::{OutputEvent, ThreadId};

#[tokio::test]
async fn surfaces_tool_call_and_resolves_on_respond() {
    let runtime = AgentRuntime::new();
    let thread_id = ThreadId::new("s3-tool-call");
    let config = thread_config("S3", None, None);

    runtime
        .ensure_started(thread_id.clone(), config)
        .await
        .expect("agent should start");

    let output = runtime
        .send_message(&thread_id, "hi")
        .expect("thread should accept a message");

    let mut events = Vec::new();
    while let Some(event) = output.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 1, "tool call should end the turn's stream, got {events:?}");
    let OutputEvent::ToolCall {
        request_id,
        method,
        arguments,
    } = &events[0]
    else {
        panic!("expected a ToolCall event, got {:?}", events[0]);
    };
    assert_eq!(request_id.as_str(), Some("acp:7"));
    assert_eq!(method, "fs.read");
    assert_eq!(arguments, "{\"path\":\"/tmp/a\"}");

    let followup = runtime
        .respond_to_request(&thread_id, "acp:7", "\"contents\"")
        .await
        .expect("a pending tool call should be answerable");
    // Nothing further streams for this canned response; the queue just
    // closes once the job finishes.
    assert_eq!(followup.recv().await, None);
}
