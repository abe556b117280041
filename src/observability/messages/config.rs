// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for swarmlet configuration loading, validation and building.

use crate::errors::ValidationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A swarmlet file was read and parsed.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use swarmlet::observability::messages::config::ConfigLoaded;
///
/// let msg = ConfigLoaded {
///     path: "pipeline.yaml",
///     name: "pipeline",
///     accessors: 2,
///     connections: 3,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Loaded swarmlet 'pipeline' from pipeline.yaml: 2 accessors, 3 connections"
/// );
/// ```
pub struct ConfigLoaded<'a> {
    pub path: &'a str,
    pub name: &'a str,
    pub accessors: usize,
    pub connections: usize,
}

impl Display for ConfigLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded swarmlet '{}' from {}: {} accessors, {} connections",
            self.name, self.path, self.accessors, self.connections
        )
    }
}

impl StructuredLog for ConfigLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            path = self.path,
            swarmlet = self.name,
            accessors = self.accessors,
            connections = self.connections,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "config_loaded",
            span_name = name,
            path = self.path,
            swarmlet = self.name,
        )
    }
}

/// A swarmlet file failed validation.
///
/// # Log Level
/// `error!` - The swarmlet is not built
pub struct ConfigValidationFailed<'a> {
    pub path: &'a str,
    pub errors: &'a [ValidationError],
}

impl Display for ConfigValidationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Swarmlet {} failed validation with {} errors", self.path, self.errors.len())?;
        for error in self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl StructuredLog for ConfigValidationFailed<'_> {
    fn log(&self) {
        tracing::error!(path = self.path, error_count = self.errors.len(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "config_validation_failed",
            span_name = name,
            path = self.path,
            error_count = self.errors.len(),
        )
    }
}

/// A swarmlet was turned into a top-level composite accessor.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SwarmletBuilt<'a> {
    pub name: &'a str,
    pub accessors: usize,
    pub connections: usize,
    pub trusted: bool,
}

impl Display for SwarmletBuilt<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built swarmlet '{}' with {} accessors and {} connections{}",
            self.name,
            self.accessors,
            self.connections,
            if self.trusted { " (trusted)" } else { "" }
        )
    }
}

impl StructuredLog for SwarmletBuilt<'_> {
    fn log(&self) {
        tracing::info!(
            swarmlet = self.name,
            accessors = self.accessors,
            connections = self.connections,
            trusted = self.trusted,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("swarmlet", span_name = name, swarmlet = self.name)
    }
}
