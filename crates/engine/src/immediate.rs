// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor that runs each operation to completion on submit

use crate::{ExecutorError, OperationExecutor};
use opq_core::{
    helper, EntryState, Operation, OperationError, OperationId, QueueEntry, QueuedOperation,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Runs every submission synchronously on the submitting thread
///
/// The returned handle is already terminal. Operation errors are captured in
/// its future rather than returned from `submit`. A panic inside the
/// operation is caught and recorded as a failure; release builds abort on
/// panic instead.
#[derive(Debug)]
pub struct ImmediateExecutor {
    next_id: AtomicU64,
}

impl Default for ImmediateExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

impl OperationExecutor for ImmediateExecutor {
    fn submit_with_priority(
        &self,
        operation: Box<dyn Operation>,
        _priority: i32,
    ) -> Result<QueuedOperation, ExecutorError> {
        let id = OperationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entry = Arc::new(QueueEntry::detached(
            id,
            operation.name(),
            operation.ownership().cloned(),
        ));
        entry.set_state_if(EntryState::Running, &[EntryState::Queued]);

        let result = panic::catch_unwind(AssertUnwindSafe(|| helper::complete(operation)))
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())));
        match result {
            Ok(last) => {
                entry.set_state_if(EntryState::Completed, &[EntryState::Running]);
                entry.future().complete(last);
                tracing::debug!(%id, operation = entry.name(), "operation completed");
            }
            Err(error) => {
                entry.set_state_if(EntryState::Failed, &[EntryState::Running]);
                tracing::warn!(%id, operation = entry.name(), %error, "operation failed");
                entry.future().fail(error);
            }
        }

        // No canceller: the entry is terminal, so cancel always reports false
        Ok(QueuedOperation::detached(entry))
    }

    fn resume(&self) -> bool {
        false
    }

    fn cancel_all(&self) -> Vec<QueuedOperation> {
        Vec::new()
    }

    fn queue(&self) -> Vec<QueuedOperation> {
        Vec::new()
    }
}

fn panic_error(payload: &(dyn Any + Send)) -> OperationError {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    OperationError::failed(format!("operation panicked: {message}"))
}
