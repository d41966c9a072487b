// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Crossing Control execution engine
//!
//! Wires the pure controller to a bus: inbound messages become events,
//! effects become publications, and every (re)connect runs recovery
//! before dispatch resumes.

mod dispatcher;
mod error;
mod executor;
mod recovery;
mod runtime;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::RuntimeError;
pub use executor::{ExecuteError, Executor};
pub use recovery::Recovery;
pub use runtime::{Runtime, RuntimeConfig};
