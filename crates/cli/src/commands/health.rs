// SPDX-License-Identifier: MIT

//! `xpod health`: read the runtime record, then ask the gateway's
//! `/service/health` endpoint whether it's serving and every backend is up.

use crate::cli::RecordArgs;
use crate::commands::{project_root, record_store_and_key};
use crate::exit_error::ExitError;
use crate::http_client;
use crate::output::format_or_json;
use xpod_gateway::SERVICE_PREFIX;

pub async fn handle(args: RecordArgs) -> Result<(), ExitError> {
    let root = project_root(args.project_root.as_deref()).map_err(|err| ExitError::internal(err.to_string()))?;
    let (store, key) = record_store_and_key(&root, args.env.as_deref());
    let record = store
        .load(&key)
        .map_err(|err| ExitError::internal(err.to_string()))?
        .ok_or_else(|| ExitError::not_running("no xpod node is recorded as running for this project"))?;

    let url = format!("{}{SERVICE_PREFIX}/health", record.base_url);
    let health = http_client::get_json(&url)
        .await
        .map_err(|err| ExitError::not_running(format!("node is recorded but not reachable: {err}")))?;

    let healthy = health.get("backendsHealthy").and_then(|v| v.as_bool()).unwrap_or(false);
    format_or_json(args.format, &health, |_| {
        if healthy {
            println!("{}", crate::color::paint(crate::color::codes::GREEN, "healthy"));
        } else {
            println!("{}", crate::color::paint(crate::color::codes::YELLOW, "degraded"));
        }
    });

    if healthy {
        Ok(())
    } else {
        Err(ExitError::not_running("one or more backends are unhealthy"))
    }
}
