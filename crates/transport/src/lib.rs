// SPDX-License-Identifier: MIT

//! Line-delimited JSON-RPC transport (C2) and child process handle (C4).
//!
//! `xpod-agent` composes these two into the agent transport (C7); this
//! crate knows nothing about ACP method names or session semantics.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod child;
pub mod error;
pub mod line_codec;
pub mod message;

pub use child::{ChildEvent, ChildHandle, SpawnConfig, StopSignal};
pub use error::TransportError;
pub use line_codec::{InboundEvent, LineTransport};
pub use message::{
    IncomingMessage, OutgoingNotification, OutgoingRequest, OutgoingResponse, ResponsePayload,
    RpcError, INTERNAL_ERROR, METHOD_NOT_FOUND, PARSE_ERROR,
};
