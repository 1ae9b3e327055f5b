// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake operations for tests
//!
//! Enabled for this crate's tests and for other crates through the
//! `test-support` feature.

use crate::hint::ExecutionHint;
use crate::operation::{Operation, OperationError, Step};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared record of what was done to a fake operation
#[derive(Debug, Default)]
pub struct Tracker {
    resumes: AtomicUsize,
    cancels: AtomicUsize,
    resumed_after_cancel: AtomicBool,
    hints: Mutex<Vec<ExecutionHint>>,
}

impl Tracker {
    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn resumed_after_cancel(&self) -> bool {
        self.resumed_after_cancel.load(Ordering::SeqCst)
    }

    pub fn last_hint(&self) -> Option<ExecutionHint> {
        self.hints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .copied()
    }

    fn record_resume(&self, hint: &ExecutionHint, cancelled: bool) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        if cancelled {
            self.resumed_after_cancel.store(true, Ordering::SeqCst);
        }
        self.hints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*hint);
    }

    fn record_cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Operation that finishes after a fixed number of resume calls
pub struct ScriptedOperation {
    steps: usize,
    calls: usize,
    fail_at: Option<(usize, OperationError)>,
    cancel_error: Option<OperationError>,
    then: Option<Box<dyn Operation>>,
    cancelled: bool,
    tracker: Arc<Tracker>,
}

impl ScriptedOperation {
    /// Finishes on the `steps`-th resume (at least one)
    pub fn new(steps: usize) -> Self {
        Self {
            steps: steps.max(1),
            calls: 0,
            fail_at: None,
            cancel_error: None,
            then: None,
            cancelled: false,
            tracker: Arc::new(Tracker::default()),
        }
    }

    /// Fail with `error` on the given resume call (1-based)
    pub fn failing_at(mut self, call: usize, error: OperationError) -> Self {
        self.fail_at = Some((call, error));
        self
    }

    /// Make `cancel` report an error
    pub fn with_cancel_error(mut self, error: OperationError) -> Self {
        self.cancel_error = Some(error);
        self
    }

    /// Hand off to `successor` instead of finishing
    pub fn then(mut self, successor: impl Operation + 'static) -> Self {
        self.then = Some(Box::new(successor));
        self
    }

    /// Share the tracker of another operation
    pub fn with_tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn tracker(&self) -> Arc<Tracker> {
        self.tracker.clone()
    }

    pub fn boxed(self) -> Box<dyn Operation> {
        Box::new(self)
    }
}

impl Operation for ScriptedOperation {
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        self.calls += 1;
        self.tracker.record_resume(hint, self.cancelled);

        if let Some((call, error)) = &self.fail_at {
            if *call == self.calls {
                return Err(error.clone());
            }
        }

        if self.calls < self.steps {
            return Ok(Step::Yield);
        }
        match self.then.take() {
            Some(successor) => Ok(Step::Next(successor)),
            None => Ok(Step::Done),
        }
    }

    fn cancel(&mut self) -> Result<(), OperationError> {
        self.cancelled = true;
        self.tracker.record_cancel();
        match &self.cancel_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Test-side controls for a [`GatedOperation`]
pub struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl Gate {
    /// Wait until the operation is inside `resume`
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        self.entered.recv_timeout(timeout).is_ok()
    }

    /// Let the blocked `resume` call return
    pub fn release(&self) {
        let _ = self.release.send(());
    }
}

/// Operation whose first resume blocks until the test releases it
pub struct GatedOperation {
    entered: Sender<()>,
    release: Receiver<()>,
    gated: bool,
    inner: ScriptedOperation,
}

impl GatedOperation {
    pub fn new(inner: ScriptedOperation) -> (Self, Gate) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let op = Self {
            entered: entered_tx,
            release: release_rx,
            gated: true,
            inner,
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (op, gate)
    }
}

impl Operation for GatedOperation {
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        if self.gated {
            self.gated = false;
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
        self.inner.resume(hint)
    }

    fn cancel(&mut self) -> Result<(), OperationError> {
        self.inner.cancel()
    }
}
