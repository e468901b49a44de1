// SPDX-License-Identifier: MIT

//! Quantified invariants from the agent runtime contract that aren't
//! already covered by `xpod-core`'s own proptests (FIFO ordering and
//! push-after-close are exercised directly in `crates/core/src/queue.rs`).
//! This file covers invariant 2: at most one job pumps per thread at a
//! time, so two `send_message` calls issued back-to-back never interleave
//! their output.

use crate::common::thread_config;
use tokio::time::Instant;
use xpod_agent::AgentRuntime;
use xpod_core::{OutputEvent, PushQueue, ThreadId};

async fn timestamped_events(queue: PushQueue<OutputEvent>) -> Vec<Instant> {
    let mut stamps = Vec::new();
    while queue.recv().await.is_some() {
        stamps.push(Instant::now());
    }
    stamps
}

#[tokio::test]
async fn jobs_on_one_thread_never_overlap() {
    let runtime = AgentRuntime::new();
    let thread_id = ThreadId::new("invariant-single-job");
    let config = thread_config("S1", None, None);

    runtime
        .ensure_started(thread_id.clone(), config)
        .await
        .expect("agent should start");

    // Both jobs are enqueued before either is drained, so the job pump -
    // not test-side sequencing - is what decides when each one runs.
    let first = runtime.send_message(&thread_id, "one").expect("first message should enqueue");
    let second = runtime.send_message(&thread_id, "two").expect("second message should enqueue");

    let (first_stamps, second_stamps) = tokio::join!(timestamped_events(first), timestamped_events(second));

    assert!(!first_stamps.is_empty(), "first job should have produced output");
    assert!(!second_stamps.is_empty(), "second job should have produced output");

    let first_last = *first_stamps.last().unwrap();
    let second_first = second_stamps[0];
    assert!(
        first_last <= second_first,
        "second job's first event must not arrive before the first job's last event: \
         got first_last={first_last:?} second_first={second_first:?}"
    );
}
