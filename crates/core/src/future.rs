// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-assignment completion signal for a submitted operation
//!
//! An [`OperationFuture`] is resolved exactly once, by whichever of the
//! executor or a canceller gets there first. Clones share the same state, so
//! the submitter can block on one clone while the executor resolves another.

use crate::operation::{Operation, OperationError};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Why a future did not end in success
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FutureError {
    #[error("operation {name} failed: {source}")]
    Failed {
        name: &'static str,
        #[source]
        source: OperationError,
    },
    #[error("operation {name} was cancelled")]
    Cancelled { name: &'static str },
    #[error("timed out after {0:?} waiting for operation")]
    Timeout(Duration),
}

impl FutureError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FutureError::Cancelled { .. })
    }
}

#[derive(Debug, Clone)]
enum Resolution {
    Completed,
    Failed(OperationError),
    Cancelled,
}

type Callback = Box<dyn FnOnce(Result<(), FutureError>) + Send>;
type ContinueCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Slot {
    resolution: Option<Resolution>,
    operation: Option<Box<dyn Operation>>,
    callbacks: Vec<Callback>,
    delayed: bool,
    continue_callbacks: Vec<ContinueCallback>,
}

struct Shared {
    name: &'static str,
    submitted_at: DateTime<Utc>,
    slot: Mutex<Slot>,
    ready: Condvar,
}

/// Completion handle holding the final operation or the error
#[derive(Clone)]
pub struct OperationFuture {
    shared: Arc<Shared>,
}

impl OperationFuture {
    pub fn new(name: &'static str) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                submitted_at: Utc::now(),
                slot: Mutex::new(Slot::default()),
                ready: Condvar::new(),
            }),
        }
    }

    /// Name of the operation this future tracks
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.shared.submitted_at
    }

    pub fn is_done(&self) -> bool {
        self.lock().resolution.is_some()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.lock().resolution, Some(Resolution::Completed))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.lock().resolution, Some(Resolution::Cancelled))
    }

    /// The operation's error, if it failed
    pub fn error(&self) -> Option<OperationError> {
        match &self.lock().resolution {
            Some(Resolution::Failed(e)) => Some(e.clone()),
            _ => None,
        }
    }

    /// Non-blocking peek at the result
    pub fn result(&self) -> Option<Result<(), FutureError>> {
        let slot = self.lock();
        slot.resolution.as_ref().map(|r| self.to_result(r))
    }

    /// Block until resolved
    ///
    /// Do not call this from the thread that drives the executor: the
    /// operation only advances when that thread calls `resume`.
    pub fn wait(&self) -> Result<(), FutureError> {
        let mut slot = self.lock();
        loop {
            if let Some(resolution) = &slot.resolution {
                return self.to_result(resolution);
            }
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Block until resolved or until `timeout` elapses
    pub fn wait_timeout(&self, timeout: Duration) -> Result<(), FutureError> {
        let slot = self.lock();
        let (slot, _) = self
            .shared
            .ready
            .wait_timeout_while(slot, timeout, |slot| slot.resolution.is_none())
            .unwrap_or_else(|e| e.into_inner());
        match &slot.resolution {
            Some(resolution) => self.to_result(resolution),
            None => Err(FutureError::Timeout(timeout)),
        }
    }

    /// Take the final operation out of a successful future
    ///
    /// Returns `None` if the future has not completed successfully or the
    /// operation was already taken.
    pub fn take_operation(&self) -> Option<Box<dyn Operation>> {
        self.lock().operation.take()
    }

    /// Run `callback` once the future resolves
    ///
    /// If the future is already resolved the callback runs immediately on
    /// the calling thread.
    pub fn on_done(&self, callback: impl FnOnce(Result<(), FutureError>) + Send + 'static) {
        let mut slot = self.lock();
        let Some(resolution) = slot.resolution.clone() else {
            slot.callbacks.push(Box::new(callback));
            return;
        };
        drop(slot);
        callback(self.to_result(&resolution));
    }

    /// Run `callback` only if the future fails or is cancelled
    pub fn on_failure(&self, callback: impl FnOnce(FutureError) + Send + 'static) {
        self.on_done(move |result| {
            if let Err(error) = result {
                callback(error);
            }
        });
    }

    /// Run `callback` only if the operation completes
    pub fn on_success(&self, callback: impl FnOnce() + Send + 'static) {
        self.on_done(move |result| {
            if result.is_ok() {
                callback();
            }
        });
    }

    /// True once the operation has yielded at least once without finishing
    pub fn is_delayed(&self) -> bool {
        self.lock().delayed
    }

    /// Run `callback` the first time the operation yields instead of finishing
    ///
    /// Runs immediately if that already happened. Dropped without running if
    /// the future resolves before the operation ever yields.
    pub fn on_first_continue(&self, callback: impl FnOnce() + Send + 'static) {
        let mut slot = self.lock();
        if slot.delayed {
            drop(slot);
            callback();
        } else if slot.resolution.is_none() {
            slot.continue_callbacks.push(Box::new(callback));
        }
    }

    /// Record that the operation needs more than one step
    ///
    /// Fires the first-continue callbacks. Returns false if this already
    /// happened or the future is resolved.
    pub fn delayed(&self) -> bool {
        let callbacks = {
            let mut slot = self.lock();
            if slot.delayed || slot.resolution.is_some() {
                return false;
            }
            slot.delayed = true;
            std::mem::take(&mut slot.continue_callbacks)
        };
        for callback in callbacks {
            callback();
        }
        true
    }

    /// Resolve with the final operation. Returns false if already resolved.
    pub fn complete(&self, operation: Box<dyn Operation>) -> bool {
        self.resolve(Resolution::Completed, Some(operation))
    }

    /// Resolve with an operation error. Returns false if already resolved.
    pub fn fail(&self, error: OperationError) -> bool {
        self.resolve(Resolution::Failed(error), None)
    }

    /// Resolve with the interruption signal. Returns false if already resolved.
    pub fn cancel(&self) -> bool {
        self.resolve(Resolution::Cancelled, None)
    }

    fn resolve(&self, resolution: Resolution, operation: Option<Box<dyn Operation>>) -> bool {
        let (callbacks, result) = {
            let mut slot = self.lock();
            if slot.resolution.is_some() {
                return false;
            }
            let result = self.to_result(&resolution);
            slot.resolution = Some(resolution);
            slot.operation = operation;
            slot.continue_callbacks.clear();
            (std::mem::take(&mut slot.callbacks), result)
        };
        self.shared.ready.notify_all();

        for callback in callbacks {
            callback(result.clone());
        }
        true
    }

    fn to_result(&self, resolution: &Resolution) -> Result<(), FutureError> {
        match resolution {
            Resolution::Completed => Ok(()),
            Resolution::Failed(source) => Err(FutureError::Failed {
                name: self.shared.name,
                source: source.clone(),
            }),
            Resolution::Cancelled => Err(FutureError::Cancelled {
                name: self.shared.name,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.shared.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for OperationFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.lock();
        f.debug_struct("OperationFuture")
            .field("name", &self.shared.name)
            .field("resolution", &slot.resolution)
            .field("delayed", &slot.delayed)
            .finish()
    }
}

#[cfg(test)]
#[path = "future_tests.rs"]
mod tests;
