// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for accessor lifecycle and value flow.
//!
//! This module contains message types for logging events related to:
//! * Instantiation and setup of accessors
//! * Initialize, react and wrapup
//! * Outputs sent and handler failures
//! * Errors collected by the host error sink

use crate::errors::EngineError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// An accessor was created and its `setup` completed.
///
/// # Log Level
/// `debug!` - Detailed construction information
///
/// # Example
/// ```
/// use swarmlet::observability::messages::accessor::AccessorInstantiated;
///
/// let msg = AccessorInstantiated {
///     name: "top.gain",
///     class: "math/Scale",
///     inputs: 1,
///     outputs: 1,
///     parameters: 1,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Instantiated accessor 'top.gain' of class math/Scale: 1 inputs, 1 outputs, 1 parameters"
/// );
/// ```
pub struct AccessorInstantiated<'a> {
    pub name: &'a str,
    pub class: &'a str,
    pub inputs: usize,
    pub outputs: usize,
    pub parameters: usize,
}

impl Display for AccessorInstantiated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Instantiated accessor '{}' of class {}: {} inputs, {} outputs, {} parameters",
            self.name, self.class, self.inputs, self.outputs, self.parameters
        )
    }
}

impl StructuredLog for AccessorInstantiated<'_> {
    fn log(&self) {
        tracing::debug!(
            accessor = self.name,
            class = self.class,
            inputs = self.inputs,
            outputs = self.outputs,
            parameters = self.parameters,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "accessor_instantiated",
            span_name = name,
            accessor = self.name,
            class = self.class,
        )
    }
}

/// An accessor finished `initialize`.
///
/// # Log Level
/// `info!` - Important operational event
pub struct AccessorInitialized<'a> {
    pub name: &'a str,
    pub children: usize,
    pub priority: Option<i64>,
}

impl Display for AccessorInitialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.priority {
            Some(priority) => write!(
                f,
                "Initialized accessor '{}' with {} contained accessors at priority {}",
                self.name, self.children, priority
            ),
            None => write!(
                f,
                "Initialized accessor '{}' with {} contained accessors",
                self.name, self.children
            ),
        }
    }
}

impl StructuredLog for AccessorInitialized<'_> {
    fn log(&self) {
        tracing::info!(
            accessor = self.name,
            children = self.children,
            priority = ?self.priority,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "accessor_initialized",
            span_name = name,
            accessor = self.name,
            children = self.children,
        )
    }
}

/// An accessor finished `wrapup`.
///
/// # Log Level
/// `info!` - Important operational event
pub struct AccessorWrappedUp<'a> {
    pub name: &'a str,
    pub cancelled_timers: usize,
}

impl Display for AccessorWrappedUp<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wrapped up accessor '{}', cancelled {} timers",
            self.name, self.cancelled_timers
        )
    }
}

impl StructuredLog for AccessorWrappedUp<'_> {
    fn log(&self) {
        tracing::info!(
            accessor = self.name,
            cancelled_timers = self.cancelled_timers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("accessor_wrapped_up", span_name = name, accessor = self.name)
    }
}

/// An input handler returned an error and was removed.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use swarmlet::observability::messages::accessor::InputHandlerFailed;
///
/// let error = anyhow::anyhow!("division by zero");
/// let msg = InputHandlerFailed {
///     accessor: "top.ratio",
///     input: Some("denominator"),
///     error: &error,
/// };
///
/// assert!(msg.to_string().contains("'denominator'"));
/// ```
pub struct InputHandlerFailed<'a> {
    pub accessor: &'a str,
    pub input: Option<&'a str>,
    pub error: &'a anyhow::Error,
}

impl Display for InputHandlerFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.input {
            Some(input) => write!(
                f,
                "Handler for input '{}' of accessor '{}' failed and was removed: {:#}",
                input, self.accessor, self.error
            ),
            None => write!(
                f,
                "Handler for any input of accessor '{}' failed and was removed: {:#}",
                self.accessor, self.error
            ),
        }
    }
}

impl StructuredLog for InputHandlerFailed<'_> {
    fn log(&self) {
        tracing::error!(
            accessor = self.accessor,
            input = self.input,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "input_handler_failed",
            span_name = name,
            accessor = self.accessor,
            input = self.input,
        )
    }
}

/// A value left an accessor through an output.
///
/// # Log Level
/// `debug!` - Per-value tracing
pub struct OutputSent<'a> {
    pub accessor: &'a str,
    pub output: &'a str,
    pub destinations: usize,
}

impl Display for OutputSent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Accessor '{}' sent on '{}' to {} destinations",
            self.accessor, self.output, self.destinations
        )
    }
}

impl StructuredLog for OutputSent<'_> {
    fn log(&self) {
        tracing::debug!(
            accessor = self.accessor,
            output = self.output,
            destinations = self.destinations,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "output_sent",
            span_name = name,
            accessor = self.accessor,
            output = self.output,
        )
    }
}

/// One reaction of an accessor ended.
///
/// # Log Level
/// `debug!` - Per-reaction tracing
pub struct ReactionCompleted<'a> {
    pub name: &'a str,
    pub succeeded: bool,
}

impl Display for ReactionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let outcome = if self.succeeded { "completed" } else { "failed" };
        write!(f, "Reaction of accessor '{}' {}", self.name, outcome)
    }
}

impl StructuredLog for ReactionCompleted<'_> {
    fn log(&self) {
        tracing::debug!(accessor = self.name, succeeded = self.succeeded, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("reaction", span_name = name, accessor = self.name)
    }
}

/// An error raised inside a timer callback was collected by the host.
///
/// # Log Level
/// `warn!` - Recoverable failure
pub struct HostErrorReported<'a> {
    pub accessor: &'a str,
    pub error: &'a EngineError,
}

impl Display for HostErrorReported<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Error reported to host by accessor '{}': {}",
            self.accessor, self.error
        )
    }
}

impl StructuredLog for HostErrorReported<'_> {
    fn log(&self) {
        tracing::warn!(
            accessor = self.accessor,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("host_error", span_name = name, accessor = self.accessor)
    }
}
