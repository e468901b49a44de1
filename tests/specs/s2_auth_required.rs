// SPDX-License-Identifier: MIT

//! S2 — auth required mid-turn: the fixture issues an `auth/request` before
//! continuing, which the runtime auto-acknowledges and surfaces as an
//! `AuthRequired` event without the caller having to act.

use crate::common::thread_config;
use xpod_agent::AgentRuntime;
use xpod_core::{OutputEvent, ThreadId};

#[tokio::test]
async fn surfaces_auth_required_then_resumes() {
    let runtime = AgentRuntime::new();
    let thread_id = ThreadId::new("s2-auth");
    let config = thread_config("S2", None, None);

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

    assert_eq!(events.len(), 2, "expected AuthRequired followed by one text delta, got {events:?}");
    match &events[0] {
        OutputEvent::AuthRequired { method, url, .. } => {
            assert_eq!(method, "auth/request");
            assert_eq!(url.as_deref(), Some("https://example.com/login"));
        }
        other => panic!("expected AuthRequired first, got {other:?}"),
    }
    match &events[1] {
        OutputEvent::Text { delta } => assert_eq!(delta, "ok"),
        other => panic!("expected trailing text delta, got {other:?}"),
    }
}
