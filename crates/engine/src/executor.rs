// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor abstraction

use crate::ExecutorError;
use opq_core::{Operation, QueuedOperation};

/// Accepts operations and runs them, now or over later calls to `resume`
pub trait OperationExecutor: Send + Sync {
    /// Submit at the default priority
    fn submit(&self, operation: Box<dyn Operation>) -> Result<QueuedOperation, ExecutorError> {
        self.submit_with_priority(operation, 0)
    }

    /// Submit with a priority; higher runs first
    fn submit_with_priority(
        &self,
        operation: Box<dyn Operation>,
        priority: i32,
    ) -> Result<QueuedOperation, ExecutorError>;

    /// Do one unit of scheduled work
    ///
    /// Returns true if an operation was stepped. Says nothing about whether
    /// that step succeeded.
    fn resume(&self) -> bool;

    /// Cancel everything still pending, returning what was actually cancelled
    fn cancel_all(&self) -> Vec<QueuedOperation>;

    /// Snapshot of pending work, the operation in progress first
    fn queue(&self) -> Vec<QueuedOperation>;
}
