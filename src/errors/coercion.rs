// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::accessor::PortType;

/// Errors raised when a value cannot be converted to a port's declared type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// A non-string value bound for a `string` port could not be serialized.
    #[error("Object provided to {name} does not have a string representation: {reason}")]
    NoStringRepresentation { name: String, reason: String },

    /// A numeric port received a value that is not a number.
    #[error("{name} expected a {expected}, but got a {found}: {value}")]
    NotANumber {
        name: String,
        expected: PortType,
        found: &'static str,
        value: String,
    },

    /// An `int` port received a number with a fractional part.
    #[error("{name} expected an int, but got {value}")]
    NotAnInt { name: String, value: String },

    /// A value bound for a `JSON` port has no JSON representation.
    #[error("Object provided to {name} does not have a JSON representation: {reason}")]
    NoJsonRepresentation { name: String, reason: String },
}
