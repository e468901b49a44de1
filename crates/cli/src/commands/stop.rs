// SPDX-License-Identifier: MIT

//! `xpod stop`: signal the recorded node pid and wait (bounded by
//! `--timeout`) for it to exit, then remove the runtime record regardless.

use crate::cli::StopArgs;
use crate::commands::{project_root, record_store_and_key};
use crate::exit_error::ExitError;
use crate::output::format_or_json;
use std::time::Duration;

pub async fn handle(args: StopArgs) -> Result<(), ExitError> {
    let root = project_root(args.project_root.as_deref()).map_err(|err| ExitError::internal(err.to_string()))?;
    let (store, key) = record_store_and_key(&root, args.env.as_deref());
    let record = store
        .load(&key)
        .map_err(|err| ExitError::internal(err.to_string()))?
        .ok_or_else(|| ExitError::not_running("no xpod node is recorded as running for this project"))?;

    let pid = nix::unistd::Pid::from_raw(record.pid as i32);
    if let Err(err) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGINT) {
        if err != nix::errno::Errno::ESRCH {
            return Err(ExitError::internal(format!("failed to signal pid {}: {err}", record.pid)));
        }
        // Process is already gone; fall through to clean up the stale record.
    } else {
        wait_for_exit(pid, Duration::from_millis(args.timeout)).await;
    }

    store
        .remove(&key)
        .map_err(|err| ExitError::internal(format!("failed to remove runtime record: {err}")))?;

    format_or_json(args.format, &serde_json::json!({ "stopped": true, "pid": record.pid }), |_| {
        println!("stopped xpod (pid {})", record.pid);
    });
    Ok(())
}

async fn wait_for_exit(pid: nix::unistd::Pid, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        match nix::sys::signal::kill(pid, None) {
            Err(nix::errno::Errno::ESRCH) => return,
            _ => tokio::time::sleep(Duration::from_millis(100)).await,
        }
    }
}
