// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for binding and releasing mutable accessors.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A mutable was bound to an accessor.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use swarmlet::observability::messages::reification::ReificationCompleted;
///
/// let msg = ReificationCompleted {
///     mutable: "m",
///     accessor: "m.Scale",
///     inputs: 1,
///     outputs: 1,
/// };
///
/// assert_eq!(msg.to_string(), "Reified 'm' by 'm.Scale': 1 inputs and 1 outputs wired");
/// ```
pub struct ReificationCompleted<'a> {
    pub mutable: &'a str,
    pub accessor: &'a str,
    pub inputs: usize,
    pub outputs: usize,
}

impl Display for ReificationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reified '{}' by '{}': {} inputs and {} outputs wired",
            self.mutable, self.accessor, self.inputs, self.outputs
        )
    }
}

impl StructuredLog for ReificationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            mutable = self.mutable,
            accessor = self.accessor,
            inputs = self.inputs,
            outputs = self.outputs,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reification",
            span_name = name,
            mutable = self.mutable,
            accessor = self.accessor,
        )
    }
}

/// A candidate was refused because an output type conflicts.
///
/// # Log Level
/// `warn!` - The mutable keeps its previous binding
pub struct ReificationRejected<'a> {
    pub mutable: &'a str,
    pub candidate: &'a str,
    pub output: &'a str,
}

impl Display for ReificationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cannot reify '{}' by '{}': output '{}' has a conflicting type",
            self.mutable, self.candidate, self.output
        )
    }
}

impl StructuredLog for ReificationRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            mutable = self.mutable,
            candidate = self.candidate,
            output = self.output,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "reification_rejected",
            span_name = name,
            mutable = self.mutable,
            candidate = self.candidate,
        )
    }
}

/// A mutable released the accessor it was bound to.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ReificationReleased<'a> {
    pub mutable: &'a str,
    pub accessor: &'a str,
}

impl Display for ReificationReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unreified '{}', released '{}'", self.mutable, self.accessor)
    }
}

impl StructuredLog for ReificationReleased<'_> {
    fn log(&self) {
        tracing::info!(mutable = self.mutable, accessor = self.accessor, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "unreification",
            span_name = name,
            mutable = self.mutable,
            accessor = self.accessor,
        )
    }
}

/// A connection made for a failed binding could not be removed again.
///
/// # Log Level
/// `warn!` - The binding error is still returned; the stale connection is not
///
/// # Example
/// ```
/// use swarmlet::observability::messages::reification::ReificationRollbackFailed;
///
/// let msg = ReificationRollbackFailed {
///     mutable: "m",
///     accessor: "m.Scale",
///     error: "No such connection into input 'input' of accessor 'm.Scale'",
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Failed to undo a connection of 'm' to 'm.Scale': No such connection into input 'input' of accessor 'm.Scale'"
/// );
/// ```
pub struct ReificationRollbackFailed<'a> {
    pub mutable: &'a str,
    pub accessor: &'a str,
    pub error: &'a str,
}

impl Display for ReificationRollbackFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to undo a connection of '{}' to '{}': {}",
            self.mutable, self.accessor, self.error
        )
    }
}

impl StructuredLog for ReificationRollbackFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            mutable = self.mutable,
            accessor = self.accessor,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "reification_rollback",
            span_name = name,
            mutable = self.mutable,
            accessor = self.accessor,
        )
    }
}
