// SPDX-License-Identifier: MIT

//! `xpod run`: the full node boot sequence (§ data flow at boot) — write the
//! runtime record, pick the content/API ports, register and start the two
//! backends, then bind the gateway in front of them.

use crate::cli::{RunArgs, RunMode};
use crate::commands::{default_config_path, project_root, record_store_and_key};
use crate::config::{BackendSpec, NodeConfig};
use crate::env::EnvOverlay;
use crate::exit_error::ExitError;
use chrono::Utc;
use xpod_core::RuntimeRecord;
use xpod_gateway::{bind_host_for, find_free_port, Gateway, RouteTable};
use xpod_supervisor::{BackendDescriptor, Supervisor};

pub async fn handle(args: RunArgs) -> Result<(), ExitError> {
    let project_root = project_root(None).map_err(|err| ExitError::internal(err.to_string()))?;
    let config_path = default_config_path(&project_root, args.config.as_deref());

    let overlay = match &args.env {
        Some(path) => EnvOverlay::load(path)
            .map_err(|err| ExitError::config(format!("failed to read env file {}: {err}", path.display())))?,
        None => EnvOverlay::empty(),
    };

    let node_config = NodeConfig::load_or_default(&config_path)
        .map_err(|err| ExitError::config(err.to_string()))?;

    let supervisor = Supervisor::new();
    let mut routes = RouteTable::new();

    register_backend(
        &supervisor,
        &mut routes,
        "content",
        &node_config.content,
        overlay.css_base_url(),
        &[("CSS_LOGGING_LEVEL", overlay.css_logging_level())],
    )
    .await?;
    register_backend(
        &supervisor,
        &mut routes,
        "api",
        &node_config.api,
        None,
        &[
            ("DEFAULT_API_KEY", overlay.default_api_key()),
            ("DEFAULT_API_BASE", overlay.default_api_base()),
            ("DEFAULT_MODEL", overlay.default_model()),
        ],
    )
    .await?;

    let start_results = supervisor.start_all().await;
    for (name, result) in &start_results {
        if let Err(err) = result {
            tracing::warn!(backend = %name, error = %err, "backend failed to start");
        }
    }

    let base_url = node_config
        .base_url
        .clone()
        .unwrap_or_else(|| "http://localhost".to_string());
    let host = args
        .host
        .clone()
        .or_else(|| overlay.listen_host())
        .unwrap_or_else(|| match args.mode {
            RunMode::Local => "127.0.0.1".to_string(),
            RunMode::Cloud => bind_host_for(&base_url),
        });
    let port = match args.port.or_else(|| overlay.port_override()) {
        Some(port) => port,
        None => find_free_port()
            .await
            .map_err(|err| ExitError::internal(format!("failed to pick a public port: {err}")))?,
    };

    let node_id = uuid::Uuid::new_v4().to_string();
    let gateway = Gateway::new(routes, supervisor.clone(), node_id);

    let (store, key) = record_store_and_key(&project_root, args.env.as_deref());
    let record = RuntimeRecord::new(
        std::process::id(),
        format!("{:?}", args.mode).to_lowercase(),
        port,
        format!("http://{host}:{port}"),
        config_path.to_string_lossy(),
        Utc::now(),
    );
    store
        .save(&key, &record)
        .map_err(|err| ExitError::internal(format!("failed to write runtime record: {err}")))?;

    let shutdown_gateway = gateway.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            shutdown_gateway.stop();
        }
    });

    println!("xpod listening on http://{host}:{port}");
    let serve_result = gateway.serve(&host, port).await;

    supervisor.stop_all().await;
    let _ = store.remove(&key);

    serve_result.map_err(|err| ExitError::internal(err.to_string()))
}

async fn register_backend(
    supervisor: &Supervisor,
    routes: &mut RouteTable,
    name: &str,
    spec: &Option<BackendSpec>,
    external_base_url: Option<String>,
    ambient_env: &[(&str, Option<String>)],
) -> Result<(), ExitError> {
    if let Some(base_url) = external_base_url {
        routes.insert(route_prefix_for(spec, name), base_url);
        return Ok(());
    }
    let Some(spec) = spec else {
        return Ok(());
    };

    let port = find_free_port()
        .await
        .map_err(|err| ExitError::internal(format!("failed to pick a port for {name}: {err}")))?;

    let mut descriptor = BackendDescriptor::new(name, spec.command.clone(), spec.args.clone());
    for (key, value) in ambient_env {
        if let Some(value) = value {
            descriptor.env.insert((*key).to_string(), Some(value.clone()));
        }
    }
    for (key, value) in &spec.env {
        descriptor.env.insert(key.clone(), Some(value.clone()));
    }
    descriptor.env.insert(spec.port_env.clone(), Some(port.to_string()));

    supervisor
        .register(descriptor)
        .map_err(|err| ExitError::internal(format!("failed to register {name}: {err}")))?;
    routes.insert(spec.route_prefix.clone(), format!("http://127.0.0.1:{port}"));
    Ok(())
}

fn route_prefix_for(spec: &Option<BackendSpec>, default_name: &str) -> String {
    spec.as_ref()
        .map(|s| s.route_prefix.clone())
        .unwrap_or_else(|| if default_name == "content" { "/".to_string() } else { format!("/{default_name}") })
}
