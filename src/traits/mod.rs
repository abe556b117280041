// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Seams between the accessor engine and its collaborators.
//!
//! * [`AccessorDefinition`] - the behaviour of an accessor class (setup and lifecycle hooks)
//! * [`SourceProvider`] - resolves a qualified class name to a definition
//! * [`Timers`] - one-shot and periodic callbacks on the host event loop

pub mod definition;
pub mod source_provider;
pub mod timers;

pub use definition::{AccessorDefinition, SetupFn};
pub use source_provider::SourceProvider;
pub use timers::{TimerHandle, Timers};
