// SPDX-License-Identifier: MIT

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind gateway listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no route matches path {path}")]
    NoRoute { path: String },

    #[error("failed to reach backend {target}: {source}")]
    BackendUnreachable {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("backend {target} returned a malformed response: {message}")]
    BadGateway { target: String, message: String },
}
