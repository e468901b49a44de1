// SPDX-License-Identifier: MIT

//! Black-box scenarios S1-S6 plus the quantified invariants from the agent
//! runtime's contract, run against the compiled fixture agent and a real
//! supervisor rather than mocks.

#[path = "specs/common.rs"]
mod common;

#[path = "specs/s1_echo.rs"]
mod s1_echo;

#[path = "specs/s2_auth_required.rs"]
mod s2_auth_required;

#[path = "specs/s3_tool_call.rs"]
mod s3_tool_call;

#[path = "specs/s4_session_params.rs"]
mod s4_session_params;

#[path = "specs/s5_no_agent_config.rs"]
mod s5_no_agent_config;

#[path = "specs/s6_supervisor_restart.rs"]
mod s6_supervisor_restart;

#[path = "specs/invariants.rs"]
mod invariants;
