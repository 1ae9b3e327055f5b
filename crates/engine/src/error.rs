// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for executors

use thiserror::Error;

/// Errors returned when an executor refuses a submission
///
/// These are raised before the operation runs. Failures of the operation
/// itself are reported through its future instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("operation rejected: queue is full (capacity {capacity})")]
    Rejected { capacity: usize },
    #[error("operation rejected: executor is shut down")]
    ShutDown,
}
