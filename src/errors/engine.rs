// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by the accessor engine.
//!
//! Every variant is fatal at the call site that produced it: nothing in the engine
//! retries or silently degrades. Errors raised inside timer callbacks or internally
//! scheduled reactions are routed to the host error sink instead (see
//! [`crate::engine::Host::take_errors`]).

use std::fmt;

use thiserror::Error;

use crate::errors::CoercionError;

/// The kind of port an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    Input,
    Output,
    Parameter,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Input => write!(f, "input"),
            PortKind::Output => write!(f, "output"),
            PortKind::Parameter => write!(f, "parameter"),
        }
    }
}

/// Lifecycle hooks of an accessor definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Initialize,
    Fire,
    Wrapup,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Initialize => write!(f, "initialize()"),
            Hook::Fire => write!(f, "fire()"),
            Hook::Wrapup => write!(f, "wrapup()"),
        }
    }
}

fn describe_handler_target(input: &Option<String>) -> String {
    match input {
        Some(name) => format!("input '{}'", name),
        None => "any input".to_string(),
    }
}

/// Errors produced by accessor construction, wiring, scheduling and reactions.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A port name did not resolve on the named accessor.
    #[error("Accessor '{accessor}' has no {kind} named '{name}'")]
    UnknownPort {
        accessor: String,
        kind: PortKind,
        name: String,
    },

    /// The destination port of a connection already has a source.
    #[error("The {kind} '{port}' of accessor '{accessor}' is already connected to a source")]
    AlreadyConnected {
        accessor: String,
        kind: PortKind,
        port: String,
    },

    /// A disconnect named a connection that does not exist.
    #[error("No such connection into {kind} '{port}' of accessor '{accessor}'")]
    NotConnected {
        accessor: String,
        kind: PortKind,
        port: String,
    },

    /// Two accessors with the same name in one container (or in the runtime registry).
    #[error("'{container}' already contains an accessor named '{name}'")]
    DuplicateName { container: String, name: String },

    /// An inheritance layer tried to extend a second base accessor.
    #[error("Cannot extend more than one base accessor: '{accessor}' cannot also extend '{class}'")]
    DuplicateBase { accessor: String, class: String },

    /// `extend`/`implement` called outside of a `setup()` hook.
    #[error("Accessor '{accessor}' can only extend or implement '{class}' during setup()")]
    NotInSetup { accessor: String, class: String },

    /// The source provider has no definition for the class.
    #[error("Accessor class '{class}' was not found on the search path")]
    NotFound { class: String },

    /// A directed cycle of non-spontaneous connections.
    #[error("Causality loop found including at least: {accessor} (cycle: {})", .cycle.join(" -> "))]
    CausalityLoop { accessor: String, cycle: Vec<String> },

    /// An accessor was scheduled before its container assigned it a priority.
    #[error("Accessor does not have a priority: {accessor}. Perhaps its container was not initialized?")]
    Unprioritized { accessor: String },

    /// `reify`/`unreify` on an accessor that never declared itself mutable.
    #[error("Accessor '{accessor}' is not a mutable accessor")]
    NotMutable { accessor: String },

    /// A reification candidate already belongs to another container.
    #[error("Accessor '{accessor}' is already contained by '{container}'")]
    AlreadyContained { accessor: String, container: String },

    /// A connection named an accessor that the connecting container does not contain.
    #[error("Accessor '{accessor}' is not contained by '{container}' and cannot be connected there")]
    NotContained { accessor: String, container: String },

    /// Registry enumeration without the trusted capability.
    #[error("Accessor '{accessor}' is not trusted to access the top-level accessor registry")]
    NotTrusted { accessor: String },

    /// A value could not be converted to a port's declared type.
    #[error("Accessor '{accessor}': {source}")]
    Coercion {
        accessor: String,
        #[source]
        source: CoercionError,
    },

    /// An input handler failed and has been removed.
    #[error(
        "Exception occurred in input handler of accessor '{accessor}' for {}. Handler has been removed",
        describe_handler_target(.input)
    )]
    Handler {
        accessor: String,
        input: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// A lifecycle hook of an accessor definition failed.
    #[error("{hook} of accessor '{accessor}' failed")]
    Hook {
        accessor: String,
        hook: Hook,
        #[source]
        source: anyhow::Error,
    },

    /// The setup() hook of a definition (or of one of its base layers) failed.
    #[error("setup() of accessor '{accessor}' ({class}) failed")]
    Setup {
        accessor: String,
        class: String,
        #[source]
        source: anyhow::Error,
    },

    /// A timer callback registered through an accessor failed.
    #[error("Timer callback of accessor '{accessor}' failed")]
    Timer {
        accessor: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// Name of the accessor the error is attributed to, when there is one.
    pub fn accessor(&self) -> Option<&str> {
        match self {
            EngineError::UnknownPort { accessor, .. }
            | EngineError::AlreadyConnected { accessor, .. }
            | EngineError::NotConnected { accessor, .. }
            | EngineError::DuplicateBase { accessor, .. }
            | EngineError::NotInSetup { accessor, .. }
            | EngineError::CausalityLoop { accessor, .. }
            | EngineError::Unprioritized { accessor }
            | EngineError::NotMutable { accessor }
            | EngineError::AlreadyContained { accessor, .. }
            | EngineError::NotContained { accessor, .. }
            | EngineError::NotTrusted { accessor }
            | EngineError::Coercion { accessor, .. }
            | EngineError::Handler { accessor, .. }
            | EngineError::Hook { accessor, .. }
            | EngineError::Setup { accessor, .. }
            | EngineError::Timer { accessor, .. } => Some(accessor.as_str()),
            EngineError::DuplicateName { container, .. } => Some(container.as_str()),
            EngineError::NotFound { .. } => None,
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
