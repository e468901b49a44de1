// SPDX-License-Identifier: MIT

//! Process supervisor (§4.4 C5): register named backends, start/stop them,
//! bounded auto-restart with reset, aggregate status.
//!
//! Grounded in the teacher's `coop/spawn.rs` reaper-task discipline (one
//! task owns `child.wait()`) and in `oj-daemon`'s per-resource
//! `tokio::sync::Mutex` serialization pattern — `startAll`/`stopAll`/restart
//! for one backend never race each other, while different backends proceed
//! in parallel.

use crate::backend::{BackendDescriptor, BackendStatus, ExitInfo};
use crate::error::SupervisorError;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use xpod_core::BackendName;
use xpod_transport::{ChildEvent, ChildHandle, SpawnConfig, StopSignal};

/// Retry budget per backend before auto-restart gives up and leaves the
/// backend surfaced as down in `status()`.
const MAX_RESTART_ATTEMPTS: u32 = 5;

/// `SIGINT` → `SIGTERM` grace period during `stopAll`.
const STOP_GRACE: Duration = Duration::from_secs(3);

fn backoff_for_attempt(attempt: u32) -> Duration {
    let millis = 250u64.saturating_mul(1u64 << attempt.min(6));
    Duration::from_millis(millis.min(10_000))
}

struct Mutable {
    handle: Option<Arc<ChildHandle>>,
    running: bool,
    restart_count: u32,
    last_exit: Option<ExitInfo>,
    stopping: bool,
}

impl Mutable {
    fn new() -> Self {
        Self {
            handle: None,
            running: false,
            restart_count: 0,
            last_exit: None,
            stopping: false,
        }
    }
}

struct Entry {
    descriptor: BackendDescriptor,
    mutable: AsyncMutex<Mutable>,
    monitor_started: AtomicBool,
    monitor_handle: SyncMutex<Option<JoinHandle<()>>>,
    restart_budget_exhausted: AtomicU32,
}

/// Owns every supervised backend for the lifetime of the node process.
#[derive(Clone)]
pub struct Supervisor {
    backends: Arc<SyncMutex<HashMap<BackendName, Arc<Entry>>>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            backends: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    /// Registers a backend. Must not already be running; names must be
    /// unique.
    pub fn register(&self, descriptor: BackendDescriptor) -> Result<(), SupervisorError> {
        let mut backends = self.backends.lock();
        if backends.contains_key(&descriptor.name) {
            return Err(SupervisorError::DuplicateBackend(descriptor.name));
        }
        let name = descriptor.name.clone();
        backends.insert(
            name,
            Arc::new(Entry {
                descriptor,
                mutable: AsyncMutex::new(Mutable::new()),
                monitor_started: AtomicBool::new(false),
                monitor_handle: SyncMutex::new(None),
                restart_budget_exhausted: AtomicU32::new(0),
            }),
        );
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<Arc<Entry>, SupervisorError> {
        self.backends
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| SupervisorError::UnknownBackend(BackendName::new(name)))
    }

    /// Starts every registered backend. A spawn failure for one backend is
    /// reported in the returned vector but does not prevent the others from
    /// starting.
    pub async fn start_all(&self) -> Vec<(BackendName, Result<(), SupervisorError>)> {
        let entries: Vec<Arc<Entry>> = self.backends.lock().values().cloned().collect();
        let mut handles = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.descriptor.name.clone();
            handles.push(async move {
                let result = start_backend(entry).await;
                (name, result)
            });
        }
        futures_join_all(handles).await
    }

    pub async fn stop_all(&self) {
        let entries: Vec<Arc<Entry>> = self.backends.lock().values().cloned().collect();

        for entry in &entries {
            let mut mutable = entry.mutable.lock().await;
            mutable.stopping = true;
            if let Some(handle) = &mutable.handle {
                if let Err(err) = handle.stop(StopSignal::Sigint) {
                    warn!(backend = %entry.descriptor.name, error = %err, "SIGINT failed");
                }
            }
        }

        tokio::time::sleep(STOP_GRACE).await;

        for entry in &entries {
            let mutable = entry.mutable.lock().await;
            if mutable.running {
                if let Some(handle) = &mutable.handle {
                    if let Err(err) = handle.stop(StopSignal::Sigterm) {
                        warn!(backend = %entry.descriptor.name, error = %err, "SIGTERM failed");
                    }
                }
            }
        }

        for entry in &entries {
            let handle = entry.monitor_handle.lock().take();
            if let Some(handle) = handle {
                let _ = handle.await;
            }
        }
    }

    /// Resets every backend's restart counter to zero.
    pub async fn reset_restart_counts(&self) {
        let entries: Vec<Arc<Entry>> = self.backends.lock().values().cloned().collect();
        for entry in entries {
            entry.mutable.lock().await.restart_count = 0;
        }
    }

    /// Ordered status report, one row per registered backend in
    /// registration... effectively insertion-stable order via a sorted name
    /// list, so repeated calls are deterministic.
    pub async fn status(&self) -> Vec<BackendStatus> {
        let mut entries: Vec<Arc<Entry>> = self.backends.lock().values().cloned().collect();
        entries.sort_by(|a, b| a.descriptor.name.as_str().cmp(b.descriptor.name.as_str()));
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let mutable = entry.mutable.lock().await;
            out.push(BackendStatus {
                name: entry.descriptor.name.clone(),
                running: mutable.running,
                restart_count: mutable.restart_count,
                last_exit: mutable.last_exit,
            });
        }
        out
    }
}

async fn start_backend(entry: Arc<Entry>) -> Result<(), SupervisorError> {
    {
        let mutable = entry.mutable.lock().await;
        if mutable.running {
            return Err(SupervisorError::AlreadyRunning {
                name: entry.descriptor.name.clone(),
            });
        }
    }

    let (tx, rx) = oneshot::channel();
    if !entry.monitor_started.swap(true, Ordering::SeqCst) {
        let monitor = tokio::spawn(run_backend(entry.clone(), Some(tx)));
        *entry.monitor_handle.lock() = Some(monitor);
    } else {
        // A monitor task already owns this backend's lifecycle (e.g. a
        // concurrent start_all call raced this one); report success
        // immediately so callers don't hang waiting on a spawn that already
        // happened or is in flight.
        let _ = tx.send(Ok(()));
    }

    rx.await.unwrap_or_else(|_| {
        Err(SupervisorError::Spawn {
            name: entry.descriptor.name.clone(),
            source: xpod_transport::TransportError::ChildExited,
        })
    })
}

async fn run_backend(entry: Arc<Entry>, mut first_report: Option<oneshot::Sender<Result<(), SupervisorError>>>) {
    loop {
        let config = SpawnConfig {
            command: entry.descriptor.command.clone(),
            args: entry.descriptor.args.clone(),
            working_dir: entry.descriptor.working_dir.clone(),
            env: entry.descriptor.env.clone(),
        };

        let spawned = ChildHandle::spawn(&config);
        let (handle, mut events) = match spawned {
            Ok(pair) => pair,
            Err(source) => {
                warn!(backend = %entry.descriptor.name, error = %source, "spawn failed");
                if let Some(tx) = first_report.take() {
                    let _ = tx.send(Err(SupervisorError::Spawn {
                        name: entry.descriptor.name.clone(),
                        source,
                    }));
                }
                if !schedule_retry(&entry).await {
                    return;
                }
                continue;
            }
        };

        info!(backend = %entry.descriptor.name, pid = handle.pid(), "backend started");
        {
            let mut mutable = entry.mutable.lock().await;
            mutable.handle = Some(Arc::new(handle));
            mutable.running = true;
        }
        if let Some(tx) = first_report.take() {
            let _ = tx.send(Ok(()));
        }

        let exit = loop {
            match events.recv().await {
                Some(ChildEvent::Exit { code, signal }) => break Some(ExitInfo { code, signal }),
                Some(ChildEvent::Error(err)) => {
                    warn!(backend = %entry.descriptor.name, error = %err, "child error event");
                }
                Some(ChildEvent::Data(_)) => {}
                None => break None,
            }
        };

        info!(backend = %entry.descriptor.name, exit = ?exit, "backend exited");
        {
            let mut mutable = entry.mutable.lock().await;
            mutable.running = false;
            mutable.handle = None;
            mutable.last_exit = exit;
        }

        if !schedule_retry(&entry).await {
            return;
        }
    }
}

/// Returns `true` if the monitor loop should attempt another spawn.
async fn schedule_retry(entry: &Arc<Entry>) -> bool {
    let attempt = {
        let mut mutable = entry.mutable.lock().await;
        if mutable.stopping {
            return false;
        }
        if mutable.restart_count >= MAX_RESTART_ATTEMPTS {
            entry.restart_budget_exhausted.fetch_add(1, Ordering::SeqCst);
            warn!(backend = %entry.descriptor.name, "restart budget exhausted, leaving down");
            return false;
        }
        mutable.restart_count += 1;
        mutable.restart_count
    };
    tokio::time::sleep(backoff_for_attempt(attempt)).await;
    true
}

/// Minimal stand-in for `futures::future::join_all` so this crate doesn't
/// need to pull in the full `futures` crate for one call site.
async fn futures_join_all<F, T>(futures: Vec<F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(value) => out.push(value),
            Err(_) => continue,
        }
    }
    out
}
