// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Timer facility implementations.
//!
//! - [`ManualTimers`]: virtual time pumped by its owner. Deterministic, used by tests and
//!   by embedders that drive their own loop.
//! - [`TokioTimers`]: local tasks on a tokio `LocalSet`, used by the CLI.

mod manual;
mod tokio_timers;

pub use manual::{ManualTimers, MAX_IDLE_STEPS};
pub use tokio_timers::TokioTimers;
