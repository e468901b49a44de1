// SPDX-License-Identifier: MIT

//! Gateway proxy (C6) and free-port finder (C1).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod error;
pub mod port;
pub mod proxy;
pub mod route;

pub use error::GatewayError;
pub use port::{find_free_port, find_free_ports};
pub use proxy::{bind_host_for, Gateway};
pub use route::{Route, RouteTable, SERVICE_PREFIX};
