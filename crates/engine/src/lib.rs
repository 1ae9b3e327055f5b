// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Operation executors and the tick loop that drives them

mod callback;
mod driver;
mod error;
mod executor;
mod immediate;

pub use callback::CallbackExecutor;
pub use driver::{DriverStats, TickDriver, MIN_TICK};
pub use error::ExecutorError;
pub use executor::OperationExecutor;
pub use immediate::ImmediateExecutor;
