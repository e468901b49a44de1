// SPDX-License-Identifier: MIT

//! S1 — echo through ACP: the fixture streams two text deltas then closes
//! out the prompt; the caller must observe both deltas in order and see the
//! queue close once the idle timer lapses.

use crate::common::thread_config;
use xpod_agent::AgentRuntime;
use xpod_core::{OutputEvent, ThreadId};

#[tokio::test]
async fn echoes_deltas_in_order_then_closes() {
    let runtime = AgentRuntime::new();
    let thread_id = ThreadId::new("s1-echo");
    let config = thread_config("S1", None, None);

    runtime
        .ensure_started(thread_id.clone(), config)
        .await
        .expect("agent should start");
    assert!(runtime.is_running(&thread_id));

    let output = runtime
        .send_message(&thread_id, "hi")
        .expect("thread should accept a message");

    let mut deltas = Vec::new();
    while let Some(event) = output.recv().await {
        match event {
            OutputEvent::Text { delta } => deltas.push(delta),
            other => panic!("unexpected event in S1: {other:?}"),
        }
    }

    assert_eq!(deltas, vec!["echo:".to_string(), "hello".to_string()]);
    assert_eq!(deltas.concat(), "echo:hello");
}
