// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resumable operation contract
//!
//! An [`Operation`] is a unit of work that can be advanced in bounded steps.
//! Each call to [`Operation::resume`] does some work and reports whether more
//! remains. Long edits yield control back to whoever is driving them by
//! returning [`Step::Yield`] or handing off to a successor with [`Step::Next`].

use crate::hint::ExecutionHint;
use crate::owned::Ownership;
use thiserror::Error;

/// Errors raised by an operation's own work
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The edit hit its change limit
    #[error("too many changes (limit: {limit})")]
    TooManyChanges { limit: u64 },
    /// The operation was interrupted, usually by cancellation
    #[error("operation interrupted")]
    Interrupted,
    /// Any other failure of the operation's work
    #[error("{0}")]
    Failed(String),
}

impl OperationError {
    pub fn failed(message: impl Into<String>) -> Self {
        OperationError::Failed(message.into())
    }

    /// True for the interruption signal delivered on cancellation
    pub fn is_interrupted(&self) -> bool {
        matches!(self, OperationError::Interrupted)
    }
}

/// Result of a successful resume call
pub enum Step {
    /// More work remains; resume this same operation next time
    Yield,
    /// More work remains in a successor; resume it instead of this operation
    Next(Box<dyn Operation>),
    /// The operation is finished and must not be resumed again
    Done,
}

impl Step {
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Yield => write!(f, "Yield"),
            Step::Next(next) => write!(f, "Next({})", next.name()),
            Step::Done => write!(f, "Done"),
        }
    }
}

/// A resumable unit of work
///
/// Callers must stop resuming an operation once it returns [`Step::Done`] or
/// an error, and must never resume it after calling [`Operation::cancel`].
/// Hints are advisory: an operation that cannot subdivide its work may do a
/// full unit regardless of the budget.
pub trait Operation: Send {
    /// Advance the operation by one step
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError>;

    /// Abort the operation, leaving already-applied effects in place
    ///
    /// Called at most once. Errors are logged by the caller and never propagate.
    fn cancel(&mut self) -> Result<(), OperationError> {
        Ok(())
    }

    /// Name used in logs and error messages
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Owner attribution, if this operation carries any
    fn ownership(&self) -> Option<&Ownership> {
        None
    }
}

impl std::fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Operation built from a step closure
///
/// Convenient for small units of work such as a flush or cleanup step.
pub struct FnOperation<F> {
    name: &'static str,
    step: F,
}

impl<F> FnOperation<F>
where
    F: FnMut(&ExecutionHint) -> Result<Step, OperationError> + Send,
{
    pub fn new(name: &'static str, step: F) -> Self {
        Self { name, step }
    }
}

impl<F> Operation for FnOperation<F>
where
    F: FnMut(&ExecutionHint) -> Result<Step, OperationError> + Send,
{
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        (self.step)(hint)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Boxes a step closure that runs once and finishes
pub fn once<F>(name: &'static str, f: F) -> Box<dyn Operation>
where
    F: FnOnce() -> Result<(), OperationError> + Send + 'static,
{
    let mut f = Some(f);
    Box::new(FnOperation::new(name, move |_hint| {
        if let Some(f) = f.take() {
            f()?;
        }
        Ok(Step::Done)
    }))
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
