// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! opq-core: resumable operations and the bookkeeping to schedule them
//!
//! This crate provides:
//! - The [`Operation`] resume/cancel contract and per-step [`ExecutionHint`]
//! - Helpers that drive an operation to completion on the calling thread
//! - The [`QueueEntry`] state machine and [`QueuedOperation`] handles
//! - Composition decorators (follow-ups, ownership, tracing)
//! - TOML configuration for executors

pub mod clock;
pub mod config;
pub mod entry;
pub mod future;
pub mod handle;
pub mod helper;
pub mod hint;
pub mod operation;
pub mod owned;
pub mod traced;
pub mod wrapper;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, DriverConfig, ExecutorConfig, HintConfig};
pub use entry::{EntryState, OperationId, QueueEntry, StepOutcome};
pub use future::{FutureError, OperationFuture};
pub use handle::{Canceller, QueuedOperation};
pub use helper::LegacyError;
pub use hint::{Budget, ExecutionHint};
pub use operation::{FnOperation, Operation, OperationError, Step};
pub use owned::{OwnedOperation, Ownership};
pub use traced::TracedOperation;
pub use wrapper::{ManagedHooks, ManagedOperation, OperationWrapper, WrapperHooks};
