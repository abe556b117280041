// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the same event with structured fields at the level that
//! fits it.
//!
//! # Organization
//!
//! * `accessor` - instantiation, lifecycle and value flow of accessors
//! * `scheduler` - priority assignment and causality loops
//! * `reification` - binding and releasing mutable accessors
//! * `config` - loading, validating and building swarmlets
//!
//! # Usage Pattern
//!
//! ```rust
//! use swarmlet::observability::messages::scheduler::PrioritiesAssigned;
//! use swarmlet::observability::messages::StructuredLog;
//!
//! let msg = PrioritiesAssigned {
//!     container: "top",
//!     accessors: 3,
//!     edges: 2,
//! };
//!
//! tracing::info!("{}", msg);
//! msg.log();
//! ```

use tracing::Span;

pub mod accessor;
pub mod config;
pub mod reification;
pub mod scheduler;

/// A message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
