// SPDX-License-Identifier: MIT

//! Entry point for the `xpod` binary. Parses arguments, installs logging,
//! dispatches to the command handler, and is the single place that calls
//! `std::process::exit` (§6).

mod cli;
mod color;
mod commands;
mod config;
mod env;
mod exit_error;
mod http_client;
mod output;

use clap::Parser;
use cli::{Cli, Command, RunArgs, RunMode};
use exit_error::ExitError;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            std::process::exit(exit_error::EXIT_INTERNAL);
        }
    };

    let result = runtime.block_on(dispatch(cli));
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.code);
    }
}

async fn dispatch(cli: Cli) -> Result<(), ExitError> {
    match cli.command {
        Some(Command::Run(args)) => commands::run::handle(args).await,
        Some(Command::Status(args)) => commands::status::handle(args).await,
        Some(Command::Health(args)) => commands::health::handle(args).await,
        Some(Command::Stop(args)) => commands::stop::handle(args).await,
        None => {
            commands::run::handle(RunArgs {
                mode: RunMode::Local,
                config: None,
                env: None,
                port: None,
                host: None,
            })
            .await
        }
    }
}
