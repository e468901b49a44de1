// SPDX-License-Identifier: MIT

//! Process exit codes for the CLI (§6): commands return `Result<(),
//! ExitError>` and `main` is the only place that calls `std::process::exit`.

use std::fmt;

/// Node is not running (no usable runtime record, or the recorded pid is dead).
pub const EXIT_NOT_RUNNING: i32 = 10;
/// Bad flags, missing/malformed config, or an unreadable env file.
pub const EXIT_CONFIG: i32 = 20;
/// Spawn failure, gateway bind failure, or any other unexpected error.
pub const EXIT_INTERNAL: i32 = 50;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_running(message: impl Into<String>) -> Self {
        Self::new(EXIT_NOT_RUNNING, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EXIT_INTERNAL, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<anyhow::Error> for ExitError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}
