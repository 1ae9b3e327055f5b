// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tick loop that drives an executor on a fixed cadence

use crate::OperationExecutor;
use opq_core::DriverConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Counters reported when a driver loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    /// Ticks on which the executor actually stepped an operation
    pub steps: u64,
}

/// Shortest tick a driver will use
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Calls `resume` on an executor once per tick
///
/// Each call runs on the blocking pool, since a step may do arbitrary work.
pub struct TickDriver {
    executor: Arc<dyn OperationExecutor>,
    tick: Duration,
    idle_ticks: u32,
}

impl TickDriver {
    /// Ticks shorter than [`MIN_TICK`] are raised to it
    pub fn new(executor: Arc<dyn OperationExecutor>, tick: Duration) -> Self {
        if tick < MIN_TICK {
            tracing::warn!(tick_us = tick.as_micros() as u64, "tick too short, using minimum");
        }
        Self {
            executor,
            tick: tick.max(MIN_TICK),
            idle_ticks: DriverConfig::default().idle_ticks,
        }
    }

    pub fn from_config(executor: Arc<dyn OperationExecutor>, config: &DriverConfig) -> Self {
        Self::new(executor, config.tick).with_idle_ticks(config.idle_ticks)
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Empty ticks tolerated by [`run_until_idle`](Self::run_until_idle)
    pub fn with_idle_ticks(mut self, idle_ticks: u32) -> Self {
        self.idle_ticks = idle_ticks.max(1);
        self
    }

    /// Tick until `shutdown` becomes true or its sender is dropped
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> DriverStats {
        let mut stats = DriverStats::default();
        if *shutdown.borrow() {
            return stats;
        }

        let mut timer = interval(self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(tick_ms = self.tick.as_millis() as u64, "driver started");

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    stats.ticks += 1;
                    if self.step().await {
                        stats.steps += 1;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(ticks = stats.ticks, steps = stats.steps, "driver stopped");
        stats
    }

    /// Tick until the executor has been empty for `idle_ticks` ticks in a row
    pub async fn run_until_idle(&self) -> DriverStats {
        let mut stats = DriverStats::default();
        let mut idle = 0u32;
        let mut timer = interval(self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while idle < self.idle_ticks {
            timer.tick().await;
            stats.ticks += 1;
            if self.step().await {
                stats.steps += 1;
            }
            if self.executor.queue().is_empty() {
                idle += 1;
            } else {
                idle = 0;
            }
        }

        tracing::debug!(ticks = stats.ticks, steps = stats.steps, "executor idle");
        stats
    }

    async fn step(&self) -> bool {
        let executor = Arc::clone(&self.executor);
        match tokio::task::spawn_blocking(move || executor.resume()).await {
            Ok(stepped) => stepped,
            Err(e) => {
                tracing::error!(error = %e, "executor step panicked");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
