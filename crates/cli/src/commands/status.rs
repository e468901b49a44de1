// SPDX-License-Identifier: MIT

//! `xpod status`: read the runtime record, then ask the gateway's
//! `/service/status` endpoint for the live backend report.

use crate::cli::RecordArgs;
use crate::commands::{project_root, record_store_and_key};
use crate::exit_error::ExitError;
use crate::http_client;
use crate::output::{format_or_json, OutputFormat};
use xpod_gateway::SERVICE_PREFIX;

pub async fn handle(args: RecordArgs) -> Result<(), ExitError> {
    let root = project_root(args.project_root.as_deref()).map_err(|err| ExitError::internal(err.to_string()))?;
    let (store, key) = record_store_and_key(&root, args.env.as_deref());
    let record = store
        .load(&key)
        .map_err(|err| ExitError::internal(err.to_string()))?
        .ok_or_else(|| ExitError::not_running("no xpod node is recorded as running for this project"))?;

    let url = format!("{}{SERVICE_PREFIX}/status", record.base_url);
    let status = http_client::get_json(&url)
        .await
        .map_err(|err| ExitError::not_running(format!("node is recorded but not reachable: {err}")))?;

    format_or_json(args.format, &status, |status| {
        print_text(status);
    });
    Ok(())
}

fn print_text(status: &serde_json::Value) {
    println!("node: {}", status.get("nodeId").and_then(|v| v.as_str()).unwrap_or("?"));
    println!(
        "uptime: {}s",
        status.get("uptimeSecs").and_then(|v| v.as_u64()).unwrap_or(0)
    );
    let backends = status.get("backends").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    for backend in backends {
        let name = backend.get("name").and_then(|v| v.as_str()).unwrap_or("?");
        let running = backend.get("running").and_then(|v| v.as_bool()).unwrap_or(false);
        let restarts = backend.get("restartCount").and_then(|v| v.as_u64()).unwrap_or(0);
        let marker = if running {
            crate::color::paint(crate::color::codes::GREEN, "running")
        } else {
            crate::color::paint(crate::color::codes::RED, "stopped")
        };
        println!("  {name}: {marker} (restarts: {restarts})");
    }
}
