// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid:
//!
//! ```toml
//! queue_size = 64
//! interval = 2
//!
//! [hint]
//! block_count = 5000
//! time_limit = "30ms"
//!
//! [driver]
//! tick = "50ms"
//! idle_ticks = 100
//! ```

use crate::hint::ExecutionHint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Queue size used when none is configured
pub const DEFAULT_QUEUE_SIZE: usize = i32::MAX as usize;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for a stepped executor and the loop that drives it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Maximum number of waiting entries
    pub queue_size: usize,
    /// Step on every Nth call to resume
    pub interval: u32,
    pub hint: HintConfig,
    pub driver: DriverConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            interval: 1,
            hint: HintConfig::default(),
            driver: DriverConfig::default(),
        }
    }
}

/// Per-step work budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HintConfig {
    pub block_count: u64,
    pub prefer_single_run: bool,
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_limit: Option<Duration>,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            block_count: ExecutionHint::DEFAULT_BLOCK_COUNT,
            prefer_single_run: false,
            time_limit: None,
        }
    }
}

impl HintConfig {
    pub fn to_hint(&self) -> ExecutionHint {
        let hint = ExecutionHint::new(self.block_count, self.prefer_single_run);
        match self.time_limit {
            Some(limit) => hint.with_time_limit(limit),
            None => hint,
        }
    }
}

/// Cadence of the tick loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    /// Consecutive empty ticks before an idle-bounded run stops
    pub idle_ticks: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            idle_ticks: 100,
        }
    }
}

impl ExecutorConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ExecutorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_size == 0 {
            return Err(ConfigError::Invalid("queue_size must be at least 1".into()));
        }
        if self.interval == 0 {
            return Err(ConfigError::Invalid("interval must be at least 1".into()));
        }
        if self.hint.block_count == 0 {
            return Err(ConfigError::Invalid(
                "hint.block_count must be at least 1".into(),
            ));
        }
        if self.driver.tick.is_zero() {
            return Err(ConfigError::Invalid("driver.tick must be non-zero".into()));
        }
        Ok(())
    }

    pub fn execution_hint(&self) -> ExecutionHint {
        self.hint.to_hint()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
