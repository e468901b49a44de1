// SPDX-License-Identifier: MIT

//! Gateway proxy (§4.5 C6): binds the public port, routes inbound HTTP to
//! the right backend by longest path prefix, and serves `/service/*`
//! internally.
//!
//! Built on `axum` + `hyper` + `tower-http`, the stack
//! `matbeedotcom-remotemedia-sdk`'s `remotemedia-http` crate uses for this
//! shape of problem (axum server, hyper client for proxied requests,
//! tower-http for cors/trace). The gateway's single bind-and-serve accept
//! loop, and its `Arc<GatewayCtx>` fan-out per connection, follow the
//! teacher's `Listener`/`ListenCtx` shape in `listener/mod.rs`, collapsed
//! from a dual Unix+TCP accept loop to the gateway's single HTTP listener.

use crate::error::GatewayError;
use crate::route::{RouteTable, SERVICE_PREFIX};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get};
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use xpod_supervisor::Supervisor;

/// Env var overriding the derived bind host, to avoid `EPERM` under
/// sandboxes that disallow binding `0.0.0.0`.
pub const BIND_HOST_ENV: &str = "XPOD_GATEWAY_BIND_HOST";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Derives the bind host from a configured base URL: `localhost` maps to
/// the IPv4 loopback, an IPv6 loopback literal is preserved, anything else
/// falls back to the unspecified address. Overridable by [`BIND_HOST_ENV`].
pub fn bind_host_for(base_url: &str) -> String {
    if let Ok(value) = std::env::var(BIND_HOST_ENV) {
        if !value.is_empty() {
            return value;
        }
    }
    let host = Uri::try_from(base_url)
        .ok()
        .and_then(|uri| uri.host().map(str::to_string))
        .unwrap_or_default();
    match host.as_str() {
        "localhost" => "127.0.0.1".to_string(),
        "::1" => "::1".to_string(),
        "" => "0.0.0.0".to_string(),
        other => other.to_string(),
    }
}

struct GatewayState {
    routes: RwLock<RouteTable>,
    supervisor: Supervisor,
    client: Client<HttpConnector, Body>,
    start_time: Instant,
    node_id: String,
}

#[derive(Clone)]
pub struct Gateway {
    state: Arc<GatewayState>,
    shutdown: Arc<Notify>,
}

impl Gateway {
    pub fn new(routes: RouteTable, supervisor: Supervisor, node_id: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            state: Arc::new(GatewayState {
                routes: RwLock::new(routes),
                supervisor,
                client,
                start_time: Instant::now(),
                node_id: node_id.into(),
            }),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn set_routes(&self, routes: RouteTable) {
        *self.state.routes.write() = routes;
    }

    fn router(&self) -> Router {
        Router::new()
            .route(&format!("{SERVICE_PREFIX}/status"), get(status_handler))
            .route(&format!("{SERVICE_PREFIX}/health"), get(health_handler))
            .fallback(any(proxy_handler))
            .with_state(self.state.clone())
            .layer(
                tower::ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }

    /// Binds `host:port` and serves until [`Gateway::stop`] is called.
    /// Stops accepting new connections immediately, waits up to
    /// [`SHUTDOWN_GRACE`] for in-flight requests, then returns regardless.
    pub async fn serve(&self, host: &str, port: u16) -> Result<(), GatewayError> {
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| GatewayError::Bind {
                addr: format!("{host}:{port}"),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad bind address"),
            })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        tracing::info!(%addr, "gateway listening");
        let shutdown = self.shutdown.clone();
        let shutdown_signal = async move {
            shutdown.notified().await;
            tracing::info!("gateway shutting down, draining in-flight requests");
        };

        let serve = axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(shutdown_signal);

        match tokio::time::timeout(SHUTDOWN_GRACE + Duration::from_secs(60), serve).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                tracing::error!(error = %err, "gateway server error");
                Ok(())
            }
            Err(_) => {
                tracing::warn!("gateway shutdown grace period elapsed, forcing close");
                Ok(())
            }
        }
    }

    pub fn stop(&self) {
        self.shutdown.notify_waiters();
    }
}

async fn status_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let status = state.supervisor.status().await;
    Json(serde_json::json!({
        "nodeId": state.node_id,
        "uptimeSecs": state.start_time.elapsed().as_secs(),
        "backends": status.iter().map(|b| serde_json::json!({
            "name": b.name.as_str(),
            "running": b.running,
            "restartCount": b.restart_count,
        })).collect::<Vec<_>>(),
    }))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let status = state.supervisor.status().await;
    let all_running = status.iter().all(|b| b.running);
    let code = if all_running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(serde_json::json!({ "serving": true, "backendsHealthy": all_running })))
}

async fn proxy_handler(State(state): State<Arc<GatewayState>>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let route = {
        let routes = state.routes.read();
        routes.resolve(&path).cloned()
    };
    let Some(route) = route else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no route", "path": path })),
        )
            .into_response();
    };

    let target_uri = match build_target_uri(&route.target_base_url, req.uri()) {
        Ok(uri) => uri,
        Err(message) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response()
        }
    };

    let (mut parts, body) = req.into_parts();
    parts.uri = target_uri;
    strip_hop_by_hop_headers(&mut parts.headers);
    let outbound = Request::from_parts(parts, body);

    match state.client.request(outbound).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            tracing::warn!(target = %route.target_base_url, error = %err, "backend unreachable");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": "backend unreachable",
                    "target": route.target_base_url,
                })),
            )
                .into_response()
        }
    }
}

fn build_target_uri(base_url: &str, incoming: &Uri) -> Result<Uri, String> {
    let base: Uri = base_url
        .parse()
        .map_err(|_| format!("invalid backend base url: {base_url}"))?;
    let path_and_query = incoming
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Uri::builder()
        .scheme(base.scheme_str().unwrap_or("http"))
        .authority(base.authority().cloned().ok_or("backend base url has no host")?)
        .path_and_query(path_and_query)
        .build()
        .map_err(|err| err.to_string())
}

/// Removes headers that must not be forwarded verbatim across a proxy hop
/// (RFC 7230 §6.1), except `upgrade`/`connection` on an actual upgrade
/// request, which axum/hyper handle via the connection's `Upgrade`
/// extension rather than header copying.
fn strip_hop_by_hop_headers(headers: &mut HeaderMap) {
    const HOP_BY_HOP: &[&str] = &[
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailers",
        "transfer-encoding",
    ];
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
    headers.remove("host");
}
