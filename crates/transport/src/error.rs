// SPDX-License-Identifier: MIT

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to write to child stdin: {0}")]
    Write(#[source] io::Error),

    #[error("child stdin is closed")]
    StdinClosed,

    #[error("transport is shutting down")]
    Closed,

    #[error("timed out waiting for a response to request {id}")]
    Timeout { id: String },

    #[error("failed to spawn child process: {0}")]
    Spawn(#[source] io::Error),

    #[error("child process exited before producing output")]
    ChildExited,

    #[error("failed to send signal to child process: {0}")]
    Signal(#[source] io::Error),
}
