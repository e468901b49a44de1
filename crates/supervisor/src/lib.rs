// SPDX-License-Identifier: MIT

//! Process supervisor (C5): register named backends, start/stop them,
//! bounded auto-restart with reset, aggregate status.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod backend;
pub mod error;
pub mod supervisor;

pub use backend::{BackendDescriptor, BackendStatus, ExitInfo};
pub use error::SupervisorError;
pub use supervisor::Supervisor;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn register_rejects_duplicate_names() {
        let supervisor = Supervisor::new();
        supervisor
            .register(BackendDescriptor::new("css", "sh", vec!["-c".into(), "sleep 1".into()]))
            .unwrap();
        let err = supervisor
            .register(BackendDescriptor::new("css", "sh", vec!["-c".into(), "sleep 1".into()]))
            .unwrap_err();
        assert!(matches!(err, SupervisorError::DuplicateBackend(_)));
    }

    #[tokio::test]
    async fn start_all_reports_status_for_every_backend() {
        let supervisor = Supervisor::new();
        supervisor
            .register(BackendDescriptor::new("css", "sh", vec!["-c".into(), "sleep 0.2".into()]))
            .unwrap();
        supervisor
            .register(BackendDescriptor::new("api", "sh", vec!["-c".into(), "sleep 0.2".into()]))
            .unwrap();

        let results = supervisor.start_all().await;
        assert_eq!(results.len(), 2);
        for (_, result) in &results {
            assert!(result.is_ok());
        }

        let status = supervisor.status().await;
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].name.as_str(), "api");
        assert_eq!(status[1].name.as_str(), "css");
        assert!(status.iter().all(|s| s.running));
    }

    #[tokio::test]
    async fn stop_all_marks_every_backend_not_running() {
        let supervisor = Supervisor::new();
        supervisor
            .register(BackendDescriptor::new("css", "sh", vec!["-c".into(), "sleep 30".into()]))
            .unwrap();
        supervisor.start_all().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        supervisor.stop_all().await;

        let status = supervisor.status().await;
        assert!(status.iter().all(|s| !s.running));
    }

    #[tokio::test]
    async fn reset_restart_counts_zeroes_every_backend() {
        let supervisor = Supervisor::new();
        supervisor
            .register(BackendDescriptor::new("flaky", "sh", vec!["-c".into(), "exit 1".into()]))
            .unwrap();
        supervisor.start_all().await;
        // Give the monitor a moment to observe the exit and schedule a retry.
        tokio::time::sleep(Duration::from_millis(400)).await;
        supervisor.reset_restart_counts().await;
        let status = supervisor.status().await;
        assert_eq!(status[0].restart_count, 0);
        supervisor.stop_all().await;
    }
}
