// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use crate::errors::EngineError;

/// Problems found while validating a swarmlet configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Two contained accessors share a name
    DuplicateAccessorName {
        /// The duplicated name
        name: String,
    },
    /// The source provider has no definition for an accessor's class
    UnknownAccessorClass {
        /// The accessor declaring the class
        accessor: String,
        /// The class that couldn't be resolved
        class: String,
    },
    /// A connection endpoint refers to an accessor or port that is not declared
    UnresolvedEndpoint {
        /// The endpoint exactly as written in the file
        endpoint: String,
        /// Why the endpoint could not be resolved
        reason: String,
    },
    /// Two connections target the same destination port
    DestinationFedTwice {
        /// The destination endpoint
        destination: String,
        /// The sources feeding it, in file order
        sources: Vec<String>,
    },
    /// A connection endpoint has the wrong direction for its position
    InvalidDirection {
        /// The endpoint exactly as written in the file
        endpoint: String,
        /// Human readable description of the problem
        reason: String,
    },
    /// The swarmlet has an empty name
    EmptyName,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateAccessorName { name } => {
                write!(f, "Duplicate accessor name: '{}'", name)
            }
            ValidationError::UnknownAccessorClass { accessor, class } => {
                write!(
                    f,
                    "Accessor '{}' uses class '{}' which is not available",
                    accessor, class
                )
            }
            ValidationError::UnresolvedEndpoint { endpoint, reason } => {
                write!(f, "Connection endpoint '{}' is unresolved: {}", endpoint, reason)
            }
            ValidationError::DestinationFedTwice {
                destination,
                sources,
            } => {
                write!(
                    f,
                    "Destination '{}' is fed by more than one source: {}",
                    destination,
                    sources.join(", ")
                )
            }
            ValidationError::InvalidDirection { endpoint, reason } => {
                write!(f, "Connection endpoint '{}' is invalid: {}", endpoint, reason)
            }
            ValidationError::EmptyName => write!(f, "Swarmlet name must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading a swarmlet file and building it into accessors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read swarmlet file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML swarmlet: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse TOML swarmlet: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Swarmlet validation failed: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("Failed to build swarmlet: {0}")]
    Engine(#[from] EngineError),
}
