// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition decorators that chain a follow-up after an operation
//!
//! An [`OperationWrapper`] runs in two phases. First it resumes the wrapped
//! operation, reporting each step to its [`WrapperHooks`]. Once the wrapped
//! operation finishes or fails, the hooks may supply a follow-up (a flush or
//! cleanup step), which the wrapper then runs to completion whether or not
//! the first phase succeeded. A first-phase error is returned only after the
//! follow-up finishes; if the follow-up fails, its error replaces the
//! original one.

use crate::hint::ExecutionHint;
use crate::operation::{Operation, OperationError, Step};
use crate::owned::Ownership;

/// Callbacks invoked by an [`OperationWrapper`]
pub trait WrapperHooks: Send {
    /// After each resume of the wrapped operation. `next` is what will be
    /// resumed next, or `None` once the wrapped operation stopped.
    fn on_resume(&mut self, current: &dyn Operation, next: Option<&dyn Operation>, success: bool) {
        let _ = (current, next, success);
    }

    /// The wrapped operation finished
    fn on_success(&mut self, last: &dyn Operation) {
        let _ = last;
    }

    /// The wrapped operation failed or the wrapper was cancelled
    fn on_failure(&mut self, error: &OperationError) {
        let _ = error;
    }

    /// Follow-up to run after the wrapped operation stops
    fn next_operation(&mut self, success: bool) -> Option<Box<dyn Operation>> {
        let _ = success;
        None
    }
}

/// Two-phase decorator; see the module docs
pub struct OperationWrapper<H> {
    inner: Box<dyn Operation>,
    hooks: H,
    completed: bool,
    error: Option<OperationError>,
    follow_up: Option<Box<dyn Operation>>,
}

impl<H: WrapperHooks> OperationWrapper<H> {
    pub fn new(inner: Box<dyn Operation>, hooks: H) -> Self {
        Self {
            inner,
            hooks,
            completed: false,
            error: None,
            follow_up: None,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// True once the wrapped operation has stopped and only the follow-up remains
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn resume_inner(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        match self.inner.resume(hint) {
            Ok(Step::Yield) => {
                self.hooks.on_resume(&*self.inner, Some(&*self.inner), true);
                return Ok(Step::Yield);
            }
            Ok(Step::Next(next)) => {
                self.hooks.on_resume(&*self.inner, Some(&*next), true);
                self.inner = next;
                return Ok(Step::Yield);
            }
            Ok(Step::Done) => {
                self.hooks.on_resume(&*self.inner, None, true);
                self.hooks.on_success(&*self.inner);
            }
            Err(error) => {
                self.hooks.on_resume(&*self.inner, None, false);
                self.hooks.on_failure(&error);
                self.error = Some(error);
            }
        }

        self.completed = true;
        self.follow_up = self.hooks.next_operation(self.error.is_none());
        if self.follow_up.is_some() {
            Ok(Step::Yield)
        } else {
            self.finish()
        }
    }

    fn resume_follow_up(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        let Some(follow_up) = self.follow_up.as_mut() else {
            return self.finish();
        };
        match follow_up.resume(hint)? {
            Step::Yield => Ok(Step::Yield),
            Step::Next(next) => {
                self.follow_up = Some(next);
                Ok(Step::Yield)
            }
            Step::Done => {
                self.follow_up = None;
                self.finish()
            }
        }
    }

    fn finish(&mut self) -> Result<Step, OperationError> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(Step::Done),
        }
    }
}

impl<H: WrapperHooks> Operation for OperationWrapper<H> {
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        if self.completed {
            self.resume_follow_up(hint)
        } else {
            self.resume_inner(hint)
        }
    }

    fn cancel(&mut self) -> Result<(), OperationError> {
        let result = if !self.completed {
            self.inner.cancel()
        } else if let Some(follow_up) = self.follow_up.as_mut() {
            follow_up.cancel()
        } else {
            Ok(())
        };
        self.hooks.on_failure(&OperationError::Interrupted);
        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn ownership(&self) -> Option<&Ownership> {
        self.inner.ownership()
    }
}

type SuccessFn = Box<dyn FnMut(&dyn Operation) + Send>;
type FailureFn = Box<dyn FnMut(&OperationError) + Send>;
type ThenFn = Box<dyn FnMut(bool) -> Option<Box<dyn Operation>> + Send>;

/// Closure-backed hooks for [`ManagedOperation`]
#[derive(Default)]
pub struct ManagedHooks {
    on_success: Option<SuccessFn>,
    on_failure: Option<FailureFn>,
    then: Option<ThenFn>,
}

impl WrapperHooks for ManagedHooks {
    fn on_success(&mut self, last: &dyn Operation) {
        if let Some(f) = self.on_success.as_mut() {
            f(last);
        }
    }

    fn on_failure(&mut self, error: &OperationError) {
        if let Some(f) = self.on_failure.as_mut() {
            f(error);
        }
    }

    fn next_operation(&mut self, success: bool) -> Option<Box<dyn Operation>> {
        self.then.as_mut().and_then(|f| f(success))
    }
}

/// Wrapper configured with closures instead of a hooks type
pub type ManagedOperation = OperationWrapper<ManagedHooks>;

impl OperationWrapper<ManagedHooks> {
    pub fn managed(inner: Box<dyn Operation>) -> Self {
        Self::new(inner, ManagedHooks::default())
    }

    pub fn on_success(mut self, f: impl FnMut(&dyn Operation) + Send + 'static) -> Self {
        self.hooks.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnMut(&OperationError) + Send + 'static) -> Self {
        self.hooks.on_failure = Some(Box::new(f));
        self
    }

    /// Supply the follow-up; receives whether the wrapped operation succeeded
    pub fn then(
        mut self,
        f: impl FnMut(bool) -> Option<Box<dyn Operation>> + Send + 'static,
    ) -> Self {
        self.hooks.then = Some(Box::new(f));
        self
    }
}

#[cfg(test)]
#[path = "wrapper_tests.rs"]
mod tests;
