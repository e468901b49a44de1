// SPDX-License-Identifier: MIT

//! Top-level argument parsing (§6 external interfaces).

use crate::color::styles;
use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "xpod", version, about = "Agent-execution runtime node", styles = styles())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Boot the node: pick ports, start the backends, bind the gateway.
    /// This is also what a bare `xpod` invocation runs.
    Run(RunArgs),
    /// Report the running node's backend status.
    Status(RecordArgs),
    /// Report whether the gateway is serving and every backend is healthy.
    Health(RecordArgs),
    /// Stop a running node started with `xpod run`.
    Stop(StopArgs),
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// `local` binds loopback-only; `cloud` derives the bind host from
    /// `--config`'s `base_url`.
    #[arg(long, value_enum, default_value_t = RunMode::Local)]
    pub mode: RunMode,
    /// Path to the node config (`xpod.toml`-shaped); defaults to
    /// `./xpod.toml`, and a missing file is not an error.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Dotenv-style file to load before reading `DEFAULT_API_KEY` and
    /// friends; also the key under which the runtime record is stored.
    #[arg(long)]
    pub env: Option<PathBuf>,
    /// Public port override; otherwise `XPOD_PORT`/`PORT`, otherwise an
    /// OS-assigned free port.
    #[arg(long)]
    pub port: Option<u16>,
    /// Public bind host override; otherwise `XPOD_LISTEN_HOST`, otherwise
    /// derived from `--mode`/`base_url`.
    #[arg(long)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RunMode {
    #[default]
    Local,
    Cloud,
}

#[derive(Debug, clap::Args)]
pub struct RecordArgs {
    /// Env file key the node was started with (must match `xpod run --env`).
    #[arg(long)]
    pub env: Option<PathBuf>,
    /// Project root to look for `.xpod/runtime/` under; defaults to cwd.
    #[arg(long)]
    pub project_root: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, clap::Args)]
pub struct StopArgs {
    #[arg(long)]
    pub env: Option<PathBuf>,
    #[arg(long)]
    pub project_root: Option<PathBuf>,
    /// How long to wait for graceful shutdown before the record is removed
    /// regardless.
    #[arg(long, default_value_t = 5_000)]
    pub timeout: u64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
