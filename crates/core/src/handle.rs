// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing handle for a submitted operation

use crate::entry::{EntryState, OperationId, QueueEntry};
use crate::future::OperationFuture;
use crate::owned::Ownership;
use std::sync::{Arc, Weak};

/// Executor-side cancellation of a queued entry
///
/// Implemented by executors that must clean up their own bookkeeping (drop
/// the entry from a waiting queue, clear a current slot) when one of their
/// handles is cancelled.
pub trait Canceller: Send + Sync {
    fn cancel_entry(&self, entry: &Arc<QueueEntry>) -> bool;
}

/// Handle returned by every submission
///
/// Cheap to clone. Holds only a weak reference to the executor, so a handle
/// outliving its executor still reports state and can still cancel the entry.
#[derive(Clone)]
pub struct QueuedOperation {
    entry: Arc<QueueEntry>,
    canceller: Option<Weak<dyn Canceller>>,
}

impl QueuedOperation {
    pub fn new(entry: Arc<QueueEntry>, canceller: Weak<dyn Canceller>) -> Self {
        Self {
            entry,
            canceller: Some(canceller),
        }
    }

    /// Handle with no executor behind it
    pub fn detached(entry: Arc<QueueEntry>) -> Self {
        Self {
            entry,
            canceller: None,
        }
    }

    /// Cancel the operation
    ///
    /// Returns true if this call moved the entry to `Cancelled`; false if it
    /// had already completed, failed, or been cancelled.
    pub fn cancel(&self) -> bool {
        match self.canceller.as_ref().and_then(Weak::upgrade) {
            Some(canceller) => canceller.cancel_entry(&self.entry),
            None => self.entry.cancel(),
        }
    }

    pub fn state(&self) -> EntryState {
        self.entry.state()
    }

    pub fn future(&self) -> &OperationFuture {
        self.entry.future()
    }

    pub fn id(&self) -> OperationId {
        self.entry.id()
    }

    pub fn priority(&self) -> i32 {
        self.entry.priority()
    }

    pub fn name(&self) -> &'static str {
        self.entry.name()
    }

    pub fn ownership(&self) -> Option<&Ownership> {
        self.entry.ownership()
    }

    pub fn entry(&self) -> &Arc<QueueEntry> {
        &self.entry
    }

    /// True if both handles refer to the same submission
    pub fn ptr_eq(&self, other: &QueuedOperation) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl std::fmt::Debug for QueuedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedOperation")
            .field("id", &self.entry.id())
            .field("name", &self.entry.name())
            .field("state", &self.entry.state())
            .finish()
    }
}
