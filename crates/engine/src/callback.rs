// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stepped executor driven by an external tick
//!
//! [`CallbackExecutor`] keeps submissions in a priority queue and steps one
//! operation per eligible [`resume`](OperationExecutor::resume) call. The
//! operation being stepped sits in a separate "current" slot until it
//! finishes; a later submission never preempts it, whatever its priority.
//!
//! Queue bookkeeping happens under one mutex. The operation's own resume
//! call is made after that lock is released, so submissions and cancels from
//! other threads are never blocked by a long step. Only one step is in flight
//! at a time: a `resume` that arrives while another thread is stepping
//! returns false without touching the queue.

use crate::{ExecutorError, OperationExecutor};
use opq_core::{
    Canceller, EntryState, ExecutionHint, ExecutorConfig, Operation, OperationId, QueueEntry,
    QueuedOperation, StepOutcome,
};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

/// Priority-queue executor stepped by repeated calls to `resume`
pub struct CallbackExecutor {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<QueueState>,
    next_id: AtomicU64,
}

struct QueueState {
    waiting: BinaryHeap<Waiting>,
    /// Never also present in `waiting`
    current: Option<Arc<QueueEntry>>,
    cycle: u32,
    interval: u32,
    queue_size: usize,
    hint: ExecutionHint,
    shutdown: bool,
    /// Set while a thread is inside `QueueEntry::step`
    stepping: bool,
    seq: u64,
}

/// Clears the stepping flag when the step ends, even by unwinding
struct SteppingGuard<'a> {
    shared: &'a Shared,
}

impl Drop for SteppingGuard<'_> {
    fn drop(&mut self) {
        self.shared.lock().stepping = false;
    }
}

/// Heap slot: highest priority first, then earliest submission
struct Waiting {
    priority: i32,
    seq: u64,
    entry: Arc<QueueEntry>,
}

impl PartialEq for Waiting {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Waiting {}

impl PartialOrd for Waiting {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Waiting {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl Default for CallbackExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackExecutor {
    /// Executor with an unbounded queue, the default hint, and interval 1
    pub fn new() -> Self {
        Self::from_config(&ExecutorConfig::default())
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        let state = QueueState {
            waiting: BinaryHeap::new(),
            current: None,
            cycle: 0,
            interval: config.interval.max(1),
            queue_size: config.queue_size,
            hint: config.execution_hint(),
            shutdown: false,
            stepping: false,
            seq: 0,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Hint passed to every subsequent step
    pub fn set_hint(&self, hint: ExecutionHint) {
        self.shared.lock().hint = hint;
    }

    pub fn hint(&self) -> ExecutionHint {
        self.shared.lock().hint
    }

    /// Step on every `interval`th call to `resume`; 0 is treated as 1
    ///
    /// Restarts the cycle, so the next call steps.
    pub fn set_interval(&self, interval: u32) {
        let mut state = self.shared.lock();
        state.interval = interval.max(1);
        state.cycle = 0;
    }

    pub fn interval(&self) -> u32 {
        self.shared.lock().interval
    }

    /// Cap on waiting entries; entries already queued are kept
    pub fn set_queue_size(&self, queue_size: usize) {
        self.shared.lock().queue_size = queue_size;
    }

    pub fn queue_size(&self) -> usize {
        self.shared.lock().queue_size
    }

    /// Refuse all further submissions
    ///
    /// Pending work is left in place; call `cancel_all` to drop it.
    pub fn shutdown(&self) {
        self.shared.lock().shutdown = true;
        tracing::info!("executor shut down");
    }

    /// Shut down and cancel everything still pending
    ///
    /// Returns the entries that were cancelled, current first. Their futures
    /// resolve as cancelled, so no caller is left waiting on dropped work.
    pub fn shutdown_now(&self) -> Vec<QueuedOperation> {
        self.shutdown();
        self.cancel_all()
    }

    /// Step queued work on this thread until the queue drains or `timeout`
    /// elapses, ignoring the interval
    ///
    /// Returns true if the queue is empty. Usually called after `shutdown`.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_empty() {
            if Instant::now() >= deadline {
                tracing::warn!(remaining = self.len(), "executor did not drain in time");
                return false;
            }
            if !self.step_current(false) {
                std::thread::yield_now();
            }
        }
        true
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock().shutdown
    }

    /// Number of entries waiting or in progress
    pub fn len(&self) -> usize {
        let state = self.shared.lock();
        state.waiting.len() + usize::from(state.current.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take a waiting entry off the queue and run it to completion here
    ///
    /// Blocks the calling thread. Returns false if the entry is not waiting
    /// in this executor (already current, finished, or foreign).
    pub fn complete_now(&self, handle: &QueuedOperation) -> bool {
        let entry = handle.entry();
        {
            let mut state = self.shared.lock();
            let before = state.waiting.len();
            state.waiting.retain(|w| !Arc::ptr_eq(&w.entry, entry));
            if state.waiting.len() == before {
                return false;
            }
        }
        if !entry.set_state_if(EntryState::Running, &[EntryState::Queued]) {
            return false;
        }

        tracing::debug!(id = %entry.id(), operation = entry.name(), "completing now");
        loop {
            let outcome = entry.step(&ExecutionHint::UNBOUNDED);
            if outcome.is_finished() {
                log_outcome(entry, outcome);
                return true;
            }
        }
    }

    /// Step the current entry once, promoting the next waiting entry first
    ///
    /// With `throttle` set, only every `interval`th call steps. Returns false
    /// without counting the call when another thread is already stepping.
    fn step_current(&self, throttle: bool) -> bool {
        let (entry, hint) = {
            let mut state = self.shared.lock();
            if state.stepping {
                return false;
            }
            if throttle {
                state.cycle = if state.cycle >= state.interval {
                    1
                } else {
                    state.cycle + 1
                };
                if state.cycle != 1 {
                    return false;
                }
            }

            if state.current.is_none() {
                state.current = state.pop_next();
            }
            let Some(entry) = state.current.clone() else {
                return false;
            };
            if entry.set_state_if(EntryState::Running, &[EntryState::Queued]) {
                tracing::debug!(id = %entry.id(), operation = entry.name(), "operation started");
            }
            state.stepping = true;
            (entry, state.hint)
        };

        let outcome = {
            let _guard = SteppingGuard {
                shared: &self.shared,
            };
            entry.step(&hint)
        };

        if outcome.is_finished() {
            {
                let mut state = self.shared.lock();
                if state
                    .current
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &entry))
                {
                    state.current = None;
                }
            }
            // Running with nothing to step: the operation was lost to a
            // panic in an earlier step
            if outcome == StepOutcome::Vacant && entry.cancel() {
                tracing::warn!(id = %entry.id(), operation = entry.name(), "dropped lost operation");
            }
        }
        log_outcome(&entry, outcome);

        outcome != StepOutcome::Vacant
    }

    fn handle(&self, entry: Arc<QueueEntry>) -> QueuedOperation {
        let canceller: Weak<dyn Canceller> = Arc::downgrade(&self.shared) as Weak<dyn Canceller>;
        QueuedOperation::new(entry, canceller)
    }
}

impl OperationExecutor for CallbackExecutor {
    fn submit_with_priority(
        &self,
        operation: Box<dyn Operation>,
        priority: i32,
    ) -> Result<QueuedOperation, ExecutorError> {
        let entry = {
            let mut state = self.shared.lock();
            if state.shutdown {
                return Err(ExecutorError::ShutDown);
            }
            if state.waiting.len() >= state.queue_size {
                tracing::warn!(
                    operation = operation.name(),
                    capacity = state.queue_size,
                    "queue full, rejecting operation"
                );
                return Err(ExecutorError::Rejected {
                    capacity: state.queue_size,
                });
            }

            let id = OperationId(self.shared.next_id.fetch_add(1, AtomicOrdering::SeqCst));
            let entry = Arc::new(QueueEntry::new(id, priority, operation));
            state.seq += 1;
            let seq = state.seq;
            state.waiting.push(Waiting {
                priority,
                seq,
                entry: Arc::clone(&entry),
            });
            entry
        };

        tracing::debug!(
            id = %entry.id(),
            operation = entry.name(),
            priority,
            "operation queued"
        );
        Ok(self.handle(entry))
    }

    fn resume(&self) -> bool {
        self.step_current(true)
    }

    fn cancel_all(&self) -> Vec<QueuedOperation> {
        let entries: Vec<Arc<QueueEntry>> = {
            let mut state = self.shared.lock();
            let mut entries: Vec<_> = state.current.take().into_iter().collect();
            let waiting = std::mem::take(&mut state.waiting).into_sorted_vec();
            entries.extend(waiting.into_iter().rev().map(|w| w.entry));
            entries
        };

        let cancelled: Vec<QueuedOperation> = entries
            .into_iter()
            .filter(|entry| entry.cancel())
            .map(|entry| self.handle(entry))
            .collect();
        if !cancelled.is_empty() {
            tracing::info!(count = cancelled.len(), "cancelled all pending operations");
        }
        cancelled
    }

    fn queue(&self) -> Vec<QueuedOperation> {
        let entries: Vec<Arc<QueueEntry>> = {
            let state = self.shared.lock();
            let mut waiting: Vec<&Waiting> = state.waiting.iter().collect();
            waiting.sort_by(|a, b| b.cmp(a));
            state
                .current
                .iter()
                .cloned()
                .chain(waiting.into_iter().map(|w| Arc::clone(&w.entry)))
                .collect()
        };
        entries.into_iter().map(|entry| self.handle(entry)).collect()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Canceller for Shared {
    fn cancel_entry(&self, entry: &Arc<QueueEntry>) -> bool {
        {
            let mut state = self.lock();
            state.waiting.retain(|w| !Arc::ptr_eq(&w.entry, entry));
            if state
                .current
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, entry))
            {
                state.current = None;
            }
        }

        let cancelled = entry.cancel();
        if cancelled {
            tracing::info!(id = %entry.id(), operation = entry.name(), "operation cancelled");
        }
        cancelled
    }
}

impl QueueState {
    /// Highest-priority entry that has not already finished
    fn pop_next(&mut self) -> Option<Arc<QueueEntry>> {
        while let Some(waiting) = self.waiting.pop() {
            if !waiting.entry.state().is_terminal() {
                return Some(waiting.entry);
            }
        }
        None
    }
}

fn log_outcome(entry: &QueueEntry, outcome: StepOutcome) {
    match outcome {
        StepOutcome::Completed => {
            tracing::info!(id = %entry.id(), operation = entry.name(), "operation completed")
        }
        StepOutcome::Failed => {
            let error = entry.future().error();
            tracing::warn!(
                id = %entry.id(),
                operation = entry.name(),
                error = ?error,
                "operation failed"
            )
        }
        StepOutcome::Cancelled => {
            tracing::debug!(id = %entry.id(), operation = entry.name(), "cancelled mid-step")
        }
        StepOutcome::Pending | StepOutcome::Vacant => {}
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
