// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! opq - run and inspect stepped operation queues

mod commands;
mod fill;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, run};
use opq_core::ExecutorConfig;
use std::path::Path;

#[derive(Parser)]
#[command(
    name = "opq",
    version,
    about = "opq - drive resumable operations through a stepped executor"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue demo fill operations and drive them until idle
    Run(run::RunArgs),
    /// Print the effective executor configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    match cli.command {
        Commands::Run(args) => run::handle(args).await,
        Commands::Config(args) => config::handle(args),
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load `path` if given, otherwise the defaults
pub(crate) fn load_config(path: Option<&Path>) -> Result<ExecutorConfig> {
    match path {
        Some(path) => Ok(ExecutorConfig::load(path)?),
        None => Ok(ExecutorConfig::default()),
    }
}
