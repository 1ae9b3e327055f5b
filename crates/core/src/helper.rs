// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous drivers that run an operation to completion
//!
//! These block the calling thread until the operation finishes. There is no
//! iteration cap: an operation that never reports [`Step::Done`] loops forever.

use crate::hint::ExecutionHint;
use crate::operation::{Operation, OperationError, Step};
use thiserror::Error;

/// Errors surfaced by [`complete_legacy`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegacyError {
    #[error("too many changes (limit: {limit})")]
    TooManyChanges { limit: u64 },
    #[error("operation failed: {0}")]
    Unchecked(#[source] OperationError),
}

/// Run an operation to completion with the unbounded hint
///
/// Returns the final operation, the one that reported [`Step::Done`].
pub fn complete(op: Box<dyn Operation>) -> Result<Box<dyn Operation>, OperationError> {
    complete_with(op, &ExecutionHint::UNBOUNDED)
}

/// Run an operation to completion, passing `hint` to every resume call
pub fn complete_with(
    mut op: Box<dyn Operation>,
    hint: &ExecutionHint,
) -> Result<Box<dyn Operation>, OperationError> {
    loop {
        match op.resume(hint)? {
            Step::Yield => {}
            Step::Next(next) => op = next,
            Step::Done => return Ok(op),
        }
    }
}

/// Run an operation to completion for callers that predate typed errors
///
/// Interruption is swallowed and reported as success. Only the change limit
/// keeps its own error; everything else is folded into
/// [`LegacyError::Unchecked`]. New code should use [`complete`].
pub fn complete_legacy(op: Box<dyn Operation>) -> Result<(), LegacyError> {
    match complete(op) {
        Ok(_) => Ok(()),
        Err(OperationError::Interrupted) => {
            tracing::debug!("legacy completion interrupted");
            Ok(())
        }
        Err(OperationError::TooManyChanges { limit }) => Err(LegacyError::TooManyChanges { limit }),
        Err(e) => Err(LegacyError::Unchecked(e)),
    }
}

#[cfg(test)]
#[path = "helper_tests.rs"]
mod tests;
