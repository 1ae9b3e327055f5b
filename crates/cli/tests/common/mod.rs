// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]
#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// `opq` command with logging kept quiet unless a test asks for it
pub fn opq() -> Command {
    let mut cmd = Command::cargo_bin("opq").expect("opq binary should build");
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// Write `content` to a config file in a fresh temp dir
///
/// Returns the dir (keep it alive for the test) and the file path.
pub fn write_config(content: &str) -> (TempDir, PathBuf) {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let path = temp.path().join("opq.toml");
    fs::write(&path, content).expect("Failed to write config");
    (temp, path)
}

/// Config with a fast tick and a short idle window
pub const FAST: &str = r#"
[driver]
tick = "1ms"
idle_ticks = 2
"#;
