// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner attribution for operations
//!
//! Purely for introspection: who started an operation, what they asked for,
//! and when. Carries no scheduling semantics.

use crate::hint::ExecutionHint;
use crate::operation::{Operation, OperationError, Step};
use chrono::{DateTime, Utc};

/// Who issued an operation and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    owner: String,
    label: String,
    created_at: DateTime<Utc>,
}

impl Ownership {
    pub fn new(owner: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            label: label.into(),
            created_at: Utc::now(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Decorator that attaches [`Ownership`] to an operation
///
/// Successors returned by the wrapped operation are re-wrapped so the
/// attribution follows the whole chain.
pub struct OwnedOperation {
    ownership: Ownership,
    original: &'static str,
    current: Box<dyn Operation>,
}

impl OwnedOperation {
    pub fn new(
        owner: impl Into<String>,
        label: impl Into<String>,
        operation: Box<dyn Operation>,
    ) -> Self {
        Self::with_ownership(Ownership::new(owner, label), operation)
    }

    pub fn with_ownership(ownership: Ownership, operation: Box<dyn Operation>) -> Self {
        Self {
            ownership,
            original: operation.name(),
            current: operation,
        }
    }

    /// Name of the operation that was first wrapped
    pub fn original_name(&self) -> &'static str {
        self.original
    }

    /// Name of the operation currently being resumed
    pub fn current_name(&self) -> &'static str {
        self.current.name()
    }
}

impl Operation for OwnedOperation {
    fn resume(&mut self, hint: &ExecutionHint) -> Result<Step, OperationError> {
        match self.current.resume(hint)? {
            Step::Yield => Ok(Step::Yield),
            Step::Next(next) => {
                self.current = next;
                Ok(Step::Yield)
            }
            Step::Done => Ok(Step::Done),
        }
    }

    fn cancel(&mut self) -> Result<(), OperationError> {
        self.current.cancel()
    }

    fn name(&self) -> &'static str {
        self.original
    }

    fn ownership(&self) -> Option<&Ownership> {
        Some(&self.ownership)
    }
}
