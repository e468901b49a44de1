// SPDX-License-Identifier: MIT

//! Backend descriptor and status types (§3 Backend descriptor, §4.4 C5).

use std::collections::HashMap;
use std::path::PathBuf;
use xpod_core::BackendName;

/// Immutable description of one supervised backend, supplied at
/// [`crate::Supervisor::register`] time.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub name: BackendName,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, Option<String>>,
    pub working_dir: Option<PathBuf>,
}

impl BackendDescriptor {
    pub fn new(name: impl Into<BackendName>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: HashMap::new(),
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

/// One row of [`crate::Supervisor::status`]'s ordered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendStatus {
    pub name: BackendName,
    pub running: bool,
    pub restart_count: u32,
    pub last_exit: Option<ExitInfo>,
}
