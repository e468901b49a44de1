// SPDX-License-Identifier: MIT

//! Minimal single-shot GET client for the `status`/`health` commands,
//! reusing the same `hyper` + `hyper-util` stack the gateway proxies
//! requests with rather than pulling in a full HTTP client crate.

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: hyper::Error,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
}

/// Issues a GET request and parses the response body as JSON.
pub async fn get_json(url: &str) -> Result<serde_json::Value, GetError> {
    let client: Client<HttpConnector, Empty<Bytes>> = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
    let uri: hyper::Uri = url.parse().map_err(|_| GetError::InvalidUrl(url.to_string()))?;
    let response = client
        .get(uri)
        .await
        .map_err(|source| GetError::Request { url: url.to_string(), source })?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|source| GetError::Body { url: url.to_string(), source })?
        .to_bytes();

    if !status.is_success() && status.as_u16() != 503 {
        return Err(GetError::Status { url: url.to_string(), status: status.as_u16() });
    }

    serde_json::from_slice(&body).map_err(|_| GetError::Status { url: url.to_string(), status: status.as_u16() })
}
