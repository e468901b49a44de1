// SPDX-License-Identifier: MIT

//! S6 — supervisor restart: a backend that exits immediately gets restarted
//! with backoff, bounded by a maximum attempt count, rather than looping
//! forever or giving up after one failure.

use std::time::Duration;
use xpod_supervisor::{BackendDescriptor, Supervisor};

#[tokio::test]
async fn restarts_a_crashing_backend_with_backoff() {
    let supervisor = Supervisor::new();
    let descriptor = BackendDescriptor::new("flaky", "sh", vec!["-c".to_string(), "exit 1".to_string()]);
    supervisor.register(descriptor).expect("registration should succeed");

    let results = supervisor.start_all().await;
    assert_eq!(results.len(), 1);
    assert!(results[0].1.is_ok(), "initial spawn should succeed even though the child exits immediately");

    // The backoff schedule is 500ms, 1s, 2s, ... so two restarts land
    // comfortably inside a couple of seconds without waiting out the full
    // five-attempt budget.
    let mut last_count = 0;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let status = supervisor.status().await;
        last_count = status[0].restart_count;
        if last_count >= 2 {
            break;
        }
    }
    assert!(last_count >= 2, "expected at least two restart attempts, saw {last_count}");

    let status = supervisor.status().await;
    assert_eq!(status[0].name.as_str(), "flaky");
    assert!(status[0].last_exit.is_some());

    supervisor.stop_all().await;
}
