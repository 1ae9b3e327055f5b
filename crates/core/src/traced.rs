// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced operation wrapper for consistent observability

use crate::hint::ExecutionHint;
use crate::operation::{Operation, OperationError, Step};
use crate::owned::Ownership;
use std::time::{Duration, Instant};

/// Wrapper that logs every resume of any operation
///
/// Successors are followed in place so the step count and busy time cover
/// the whole chain.
pub struct TracedOperation {
    inner: Box<dyn Operation>,
    steps: u64,
    busy: Duration,
}

impl TracedOperation {
    pub fn new(inner: Box<dyn Operation>) -> Self {
        Self {
            inner,
            steps: 0,
            busy: Duration::ZERO,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Wall time spent inside resume calls
    pub fn busy(&self) -> Duration {
        self.busy
    }
}

impl Operation for TracedOperation {
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        let span = tracing::debug_span!("operation.resume", operation = self.inner.name(), step = self.steps + 1);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.resume(hint);
        let elapsed = start.elapsed();
        self.steps += 1;
        self.busy += elapsed;

        match result {
            Ok(Step::Yield) => {
                tracing::trace!(elapsed_ms = elapsed.as_millis() as u64, "yielded");
                Ok(Step::Yield)
            }
            Ok(Step::Next(next)) => {
                tracing::debug!(successor = next.name(), "handing off to successor");
                self.inner = next;
                Ok(Step::Yield)
            }
            Ok(Step::Done) => {
                tracing::debug!(
                    steps = self.steps,
                    busy_ms = self.busy.as_millis() as u64,
                    "operation finished"
                );
                Ok(Step::Done)
            }
            Err(e) => {
                tracing::warn!(steps = self.steps, error = %e, "operation failed");
                Err(e)
            }
        }
    }

    fn cancel(&mut self) -> Result<(), OperationError> {
        let span = tracing::debug_span!("operation.cancel", operation = self.inner.name());
        let _guard = span.enter();

        let result = self.inner.cancel();
        match &result {
            Ok(()) => tracing::debug!(steps = self.steps, "cancelled"),
            Err(e) => tracing::warn!(error = %e, "cancel failed"),
        }
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn ownership(&self) -> Option<&Ownership> {
        self.inner.ownership()
    }
}
