// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `opq run` - Queue demo fill operations and drive them until idle

use crate::fill;
use anyhow::Result;
use clap::Args;
use opq_core::QueuedOperation;
use opq_engine::{CallbackExecutor, OperationExecutor, TickDriver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct RunArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of fill operations to queue
    #[arg(long, default_value_t = 3)]
    pub operations: u32,

    /// Blocks each operation fills
    #[arg(long, default_value_t = 25_000)]
    pub blocks: u64,

    /// Fail every operation when it reaches this block
    #[arg(long)]
    pub fail_at: Option<u64>,

    /// Override the driver tick period
    #[arg(long)]
    pub tick_ms: Option<u64>,
}

pub async fn handle(args: RunArgs) -> Result<()> {
    let mut config = crate::load_config(args.config.as_deref())?;
    if let Some(ms) = args.tick_ms {
        config.driver.tick = Duration::from_millis(ms.max(1));
    }

    let executor = Arc::new(CallbackExecutor::from_config(&config));
    let mut submitted: Vec<(String, QueuedOperation)> = Vec::new();
    for i in 1..=args.operations {
        let label = format!("fill-{i}");
        let op = fill::demo_operation(&label, args.blocks, args.fail_at);
        match executor.submit(op) {
            Ok(handle) => {
                let long_label = label.clone();
                handle.future().on_first_continue(move || {
                    tracing::info!(label = %long_label, "performing long operation");
                });
                submitted.push((label, handle));
            }
            Err(e) => eprintln!("{label}: {e}"),
        }
    }

    let driver = TickDriver::from_config(executor.clone(), &config.driver);
    tokio::select! {
        stats = driver.run_until_idle() => {
            tracing::info!(ticks = stats.ticks, steps = stats.steps, "all operations finished");
        }
        Ok(()) = tokio::signal::ctrl_c() => {
            let cancelled = executor.shutdown_now();
            eprintln!("\nInterrupted, cancelled {} operation(s)", cancelled.len());
        }
    }

    for (label, handle) in &submitted {
        println!("{} {} {}", handle.id(), label, handle.state());
        if let Some(error) = handle.future().error() {
            eprintln!("{label}: {error}");
        }
    }
    Ok(())
}
