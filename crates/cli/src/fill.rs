// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo workload: a region fill that yields between budget-sized chunks

use opq_core::{
    operation, ExecutionHint, ManagedOperation, Operation, OperationError, OwnedOperation, Step,
    SystemClock, TracedOperation,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Largest run of blocks placed between budget checks
const CHUNK: u64 = 512;

/// Sets `total` blocks, as many per resume as the hint allows
pub struct FillOperation {
    total: u64,
    placed: Arc<AtomicU64>,
    fail_at: Option<u64>,
}

impl FillOperation {
    pub fn new(total: u64, fail_at: Option<u64>) -> Self {
        Self {
            total,
            placed: Arc::new(AtomicU64::new(0)),
            fail_at,
        }
    }

    /// Shared count of blocks placed so far
    pub fn placed(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.placed)
    }
}

impl Operation for FillOperation {
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        let mut budget = hint.budget(SystemClock);
        let mut placed = self.placed.load(Ordering::SeqCst);

        while placed < self.total && budget.should_continue() {
            let chunk = budget.chunk(CHUNK.min(self.total - placed));
            if let Some(bad) = self.fail_at {
                if bad >= placed && bad < placed + chunk {
                    self.placed.store(bad, Ordering::SeqCst);
                    return Err(OperationError::failed(format!("block {bad} rejected")));
                }
            }
            placed += chunk;
            budget.spend(chunk);
        }

        self.placed.store(placed, Ordering::SeqCst);
        if placed >= self.total {
            Ok(Step::Done)
        } else {
            Ok(Step::Yield)
        }
    }

    fn name(&self) -> &'static str {
        "fill"
    }
}

/// Fill wrapped the way a command would submit it: owned, traced, and
/// followed by a flush that runs whether or not the fill succeeded
pub fn demo_operation(label: &str, blocks: u64, fail_at: Option<u64>) -> Box<dyn Operation> {
    let fill = FillOperation::new(blocks, fail_at);
    let placed = fill.placed();
    let flush_label = label.to_string();

    let managed = ManagedOperation::managed(Box::new(fill))
        .on_failure(|error| {
            if !error.is_interrupted() {
                tracing::debug!(%error, "fill stopped early");
            }
        })
        .then(move |success| {
            let placed = Arc::clone(&placed);
            let label = flush_label.clone();
            Some(operation::once("flush", move || {
                tracing::info!(
                    label = %label,
                    placed = placed.load(Ordering::SeqCst),
                    success,
                    "flushed changes"
                );
                Ok(())
            }))
        });

    let owned = OwnedOperation::new("opq", label, Box::new(managed));
    Box::new(TracedOperation::new(Box::new(owned)))
}
