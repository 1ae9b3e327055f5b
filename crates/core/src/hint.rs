// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution hints: how much work a single resume call should attempt

use crate::clock::Clock;
use std::time::{Duration, Instant};

/// Advisory step budget handed to [`Operation::resume`](crate::Operation::resume)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionHint {
    block_count: u64,
    prefer_single_run: bool,
    time_limit: Option<Duration>,
}

impl ExecutionHint {
    /// Step budget used by stepped executors unless configured otherwise
    pub const DEFAULT_BLOCK_COUNT: u64 = 10_000;

    /// Run to completion in one go
    pub const UNBOUNDED: ExecutionHint = ExecutionHint {
        block_count: u64::MAX,
        prefer_single_run: true,
        time_limit: None,
    };

    pub const fn new(block_count: u64, prefer_single_run: bool) -> Self {
        Self {
            block_count,
            prefer_single_run,
            time_limit: None,
        }
    }

    /// Also bound each step by wall time
    pub const fn with_time_limit(self, limit: Duration) -> Self {
        Self {
            time_limit: Some(limit),
            ..self
        }
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn prefer_single_run(&self) -> bool {
        self.prefer_single_run
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    pub fn is_unbounded(&self) -> bool {
        self.block_count == u64::MAX && self.time_limit.is_none()
    }

    /// Start tracking work done against this hint for one resume call
    pub fn budget<C: Clock>(&self, clock: C) -> Budget<C> {
        let started = clock.now();
        Budget {
            hint: *self,
            deadline: self.time_limit.map(|limit| started + limit),
            clock,
            spent: 0,
        }
    }
}

impl Default for ExecutionHint {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCK_COUNT, false)
    }
}

/// Per-step tracker an operation consults to decide when to yield
///
/// A hint that prefers a single run never asks the operation to stop.
#[derive(Debug)]
pub struct Budget<C: Clock> {
    hint: ExecutionHint,
    deadline: Option<Instant>,
    clock: C,
    spent: u64,
}

impl<C: Clock> Budget<C> {
    /// Record units of work done
    pub fn spend(&mut self, units: u64) {
        self.spent = self.spent.saturating_add(units);
    }

    pub fn spent(&self) -> u64 {
        self.spent
    }

    /// Units left before the block budget is exhausted
    pub fn remaining(&self) -> u64 {
        if self.hint.prefer_single_run {
            return u64::MAX;
        }
        self.hint.block_count.saturating_sub(self.spent)
    }

    /// Size of the next chunk of work, capped by what is left
    pub fn chunk(&self, wanted: u64) -> u64 {
        wanted.min(self.remaining())
    }

    pub fn should_continue(&self) -> bool {
        if self.hint.prefer_single_run {
            return true;
        }
        if self.remaining() == 0 {
            return false;
        }
        match self.deadline {
            Some(deadline) => self.clock.now() < deadline,
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "hint_tests.rs"]
mod tests;
