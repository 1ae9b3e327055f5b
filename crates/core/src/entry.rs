// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue entry state machine
//!
//! A [`QueueEntry`] is the executor's record for one submitted operation. Its
//! state only moves forward, `Queued → Running → {Completed | Failed |
//! Cancelled}` (a waiting entry may also go straight to `Cancelled`), and
//! every transition is a compare-and-set so a canceller racing the driving
//! thread sees exactly one winner.
//!
//! The entry owns the operation between steps. [`QueueEntry::step`] takes it
//! out of the slot and resumes it with no lock held; if a cancel lands while
//! the step is in flight, the stepping thread cancels the operation when the
//! step returns.

use crate::future::OperationFuture;
use crate::hint::ExecutionHint;
use crate::operation::{Operation, Step};
use crate::owned::Ownership;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Identifier assigned to each submission by its executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u64);

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Lifecycle state of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryState {
    Queued = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl EntryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EntryState::Completed | EntryState::Failed | EntryState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryState::Queued => "queued",
            EntryState::Running => "running",
            EntryState::Completed => "completed",
            EntryState::Failed => "failed",
            EntryState::Cancelled => "cancelled",
        }
    }

    fn rank(self) -> u8 {
        match self {
            EntryState::Queued => 0,
            EntryState::Running => 1,
            EntryState::Completed | EntryState::Failed | EntryState::Cancelled => 2,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => EntryState::Queued,
            1 => EntryState::Running,
            2 => EntryState::Completed,
            3 => EntryState::Failed,
            // Only discriminants of this enum are ever stored
            _ => EntryState::Cancelled,
        }
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single [`QueueEntry::step`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The operation has more work; step again later
    Pending,
    /// The operation finished and the future holds it
    Completed,
    /// The operation failed and the future holds the error
    Failed,
    /// The entry was cancelled while the step ran
    Cancelled,
    /// Nothing to step: the entry is not running or its operation is in use
    Vacant,
}

impl StepOutcome {
    /// True when the entry no longer needs stepping
    pub fn is_finished(self) -> bool {
        !matches!(self, StepOutcome::Pending)
    }
}

/// Bookkeeping record for one submitted operation
pub struct QueueEntry {
    id: OperationId,
    priority: i32,
    name: &'static str,
    ownership: Option<Ownership>,
    state: AtomicU8,
    operation: Mutex<Option<Box<dyn Operation>>>,
    future: OperationFuture,
}

impl QueueEntry {
    /// Create a queued entry that owns `operation`
    pub fn new(id: OperationId, priority: i32, operation: Box<dyn Operation>) -> Self {
        let name = operation.name();
        let ownership = operation.ownership().cloned();
        Self {
            id,
            priority,
            name,
            ownership,
            state: AtomicU8::new(EntryState::Queued as u8),
            operation: Mutex::new(Some(operation)),
            future: OperationFuture::new(name),
        }
    }

    /// Create a queued entry for an operation that is driven elsewhere
    pub fn detached(id: OperationId, name: &'static str, ownership: Option<Ownership>) -> Self {
        Self {
            id,
            priority: 0,
            name,
            ownership,
            state: AtomicU8::new(EntryState::Queued as u8),
            operation: Mutex::new(None),
            future: OperationFuture::new(name),
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ownership(&self) -> Option<&Ownership> {
        self.ownership.as_ref()
    }

    pub fn future(&self) -> &OperationFuture {
        &self.future
    }

    pub fn state(&self) -> EntryState {
        EntryState::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Move to `new` if the current state is one of `allowed`
    ///
    /// Backward moves are refused even if listed, so the state only ever
    /// advances. Returns true if this call made the transition.
    pub fn set_state_if(&self, new: EntryState, allowed: &[EntryState]) -> bool {
        let mut raw = self.state.load(Ordering::SeqCst);
        loop {
            let current = EntryState::from_raw(raw);
            if !allowed.contains(&current) || new.rank() <= current.rank() {
                return false;
            }
            match self
                .state
                .compare_exchange(raw, new as u8, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(actual) => raw = actual,
            }
        }
    }

    /// Resume the operation once
    ///
    /// The entry must already be `Running`. The resume call runs with no lock
    /// held; on completion or failure the entry moves to its terminal state
    /// and the future is resolved. The first step that leaves work pending
    /// marks the future as delayed.
    pub fn step(&self, hint: &ExecutionHint) -> StepOutcome {
        let mut operation = {
            let mut slot = self.lock_operation();
            if self.state() != EntryState::Running {
                return StepOutcome::Vacant;
            }
            let Some(operation) = slot.take() else {
                return StepOutcome::Vacant;
            };
            operation
        };

        let result = operation.resume(hint);

        let mut slot = self.lock_operation();
        match result {
            Ok(Step::Yield) => {
                let outcome = self.park(&mut slot, operation);
                drop(slot);
                self.note_continued(outcome)
            }
            Ok(Step::Next(next)) => {
                let outcome = self.park(&mut slot, next);
                drop(slot);
                self.note_continued(outcome)
            }
            Ok(Step::Done) => {
                if self.set_state_if(EntryState::Completed, &[EntryState::Running]) {
                    drop(slot);
                    self.future.complete(operation);
                    StepOutcome::Completed
                } else {
                    drop(slot);
                    self.cancel_operation(operation);
                    StepOutcome::Cancelled
                }
            }
            Err(error) => {
                if self.set_state_if(EntryState::Failed, &[EntryState::Running]) {
                    drop(slot);
                    tracing::debug!(id = %self.id, operation = self.name, %error, "step failed");
                    self.future.fail(error);
                    StepOutcome::Failed
                } else {
                    drop(slot);
                    self.cancel_operation(operation);
                    StepOutcome::Cancelled
                }
            }
        }
    }

    /// Cancel the entry if it has not reached a terminal state
    ///
    /// On success the operation's own `cancel` runs exactly once (now, or
    /// when an in-flight step returns) and the future resolves as cancelled.
    pub fn cancel(&self) -> bool {
        if !self.set_state_if(
            EntryState::Cancelled,
            &[EntryState::Queued, EntryState::Running],
        ) {
            return false;
        }

        // Empty while a step is in flight; the stepping thread cancels it
        let operation = self.lock_operation().take();
        if let Some(operation) = operation {
            self.cancel_operation(operation);
        }
        self.future.cancel();
        true
    }

    /// Put a continuing operation back, unless a cancel arrived mid-step
    fn park(
        &self,
        slot: &mut MutexGuard<'_, Option<Box<dyn Operation>>>,
        operation: Box<dyn Operation>,
    ) -> StepOutcome {
        if self.state() == EntryState::Cancelled {
            self.cancel_operation(operation);
            return StepOutcome::Cancelled;
        }
        **slot = Some(operation);
        StepOutcome::Pending
    }

    /// Signal the future the first time the operation needs another step
    fn note_continued(&self, outcome: StepOutcome) -> StepOutcome {
        if outcome == StepOutcome::Pending && self.future.delayed() {
            tracing::debug!(id = %self.id, operation = self.name, "performing long operation");
        }
        outcome
    }

    fn cancel_operation(&self, mut operation: Box<dyn Operation>) {
        if let Err(error) = operation.cancel() {
            tracing::warn!(id = %self.id, operation = self.name, %error, "error while cancelling operation");
        }
    }

    fn lock_operation(&self) -> MutexGuard<'_, Option<Box<dyn Operation>>> {
        self.operation.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
