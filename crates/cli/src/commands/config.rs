// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `opq config` - Print the effective configuration

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn handle(args: ConfigArgs) -> Result<()> {
    let config = crate::load_config(args.config.as_deref())?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
