// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for priority assignment.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Priorities of a container's accessors were recomputed.
///
/// # Log Level
/// `debug!` - Happens on every initialize and rewiring
///
/// # Example
/// ```
/// use swarmlet::observability::messages::scheduler::PrioritiesAssigned;
///
/// let msg = PrioritiesAssigned {
///     container: "top",
///     accessors: 3,
///     edges: 2,
/// };
///
/// assert_eq!(msg.to_string(), "Assigned priorities in 'top': 3 accessors, 2 edges");
/// ```
pub struct PrioritiesAssigned<'a> {
    pub container: &'a str,
    pub accessors: usize,
    pub edges: usize,
}

impl Display for PrioritiesAssigned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Assigned priorities in '{}': {} accessors, {} edges",
            self.container, self.accessors, self.edges
        )
    }
}

impl StructuredLog for PrioritiesAssigned<'_> {
    fn log(&self) {
        tracing::debug!(
            container = self.container,
            accessors = self.accessors,
            edges = self.edges,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "priorities",
            span_name = name,
            container = self.container,
            accessors = self.accessors,
        )
    }
}

/// The connections of a container form a loop without a spontaneous output.
///
/// # Log Level
/// `error!` - The rewiring or initialize is refused
///
/// # Example
/// ```
/// use swarmlet::observability::messages::scheduler::CausalityLoopDetected;
///
/// let cycle = vec!["top.a".to_string(), "top.b".to_string(), "top.a".to_string()];
/// let msg = CausalityLoopDetected {
///     container: "top",
///     cycle: &cycle,
/// };
///
/// assert!(msg.to_string().ends_with("top.a -> top.b -> top.a"));
/// ```
pub struct CausalityLoopDetected<'a> {
    pub container: &'a str,
    pub cycle: &'a [String],
}

impl Display for CausalityLoopDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Causality loop in '{}': {}",
            self.container,
            self.cycle.join(" -> ")
        )
    }
}

impl StructuredLog for CausalityLoopDetected<'_> {
    fn log(&self) {
        tracing::error!(
            container = self.container,
            cycle = ?self.cycle,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "causality_loop",
            span_name = name,
            container = self.container,
            cycle_length = self.cycle.len(),
        )
    }
}
