// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Conversion of loosely typed runtime values to declared port types.
//!
//! Coercion is applied every time a value crosses a port boundary: reading an input or
//! parameter, providing an input, sending an output and setting a parameter.
//!
//! | Declared type      | Value                | Result                                  |
//! |--------------------|----------------------|-----------------------------------------|
//! | none, or null value| anything             | unchanged                               |
//! | matches naturally  | string/number/bool   | unchanged                               |
//! | `string`           | anything else        | JSON text of the value                  |
//! | not `string`       | string               | parsed as JSON, or kept if unparseable  |
//! | `boolean`          | anything else        | truthiness                              |
//! | `number`, `int`    | anything else        | error unless numeric (and integral)     |
//! | `JSON`, other      | anything else        | unchanged once it serialises            |
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use swarmlet::accessor::{coerce, PortType};
//!
//! assert_eq!(coerce(json!("42"), Some(&PortType::Int), "x").unwrap(), json!(42));
//! assert_eq!(coerce(json!(0), Some(&PortType::Boolean), "x").unwrap(), json!(false));
//! assert_eq!(coerce(json!({"a": 1}), Some(&PortType::String), "x").unwrap(), json!("{\"a\":1}"));
//! assert!(coerce(json!(1.5), Some(&PortType::Int), "x").is_err());
//! ```

use serde_json::Value;

use crate::accessor::PortType;
use crate::errors::CoercionError;

fn natural_type(value: &Value) -> Option<PortType> {
    match value {
        Value::String(_) => Some(PortType::String),
        Value::Number(_) => Some(PortType::Number),
        Value::Bool(_) => Some(PortType::Boolean),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truthiness as understood by accessor scripts.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
        }
        _ => false,
    }
}

/// Coerce `value` to `port_type` for the port called `name`.
pub fn coerce(
    value: Value,
    port_type: Option<&PortType>,
    name: &str,
) -> Result<Value, CoercionError> {
    let Some(port_type) = port_type else {
        return Ok(value);
    };
    if value.is_null() || natural_type(&value).as_ref() == Some(port_type) {
        return Ok(value);
    }

    if *port_type == PortType::String {
        return serde_json::to_string(&value)
            .map(Value::String)
            .map_err(|e| CoercionError::NoStringRepresentation {
                name: name.to_string(),
                reason: e.to_string(),
            });
    }

    let value = match value {
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        },
        other => other,
    };

    match port_type {
        PortType::Boolean => Ok(Value::Bool(is_truthy(&value))),
        PortType::Number | PortType::Int => {
            if !value.is_number() {
                return Err(CoercionError::NotANumber {
                    name: name.to_string(),
                    expected: port_type.clone(),
                    found: kind_of(&value),
                    value: value.to_string(),
                });
            }
            if *port_type == PortType::Int && !is_integral(&value) {
                return Err(CoercionError::NotAnInt {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
            Ok(value)
        }
        _ => serde_json::to_string(&value)
            .map(|_| value)
            .map_err(|e| CoercionError::NoJsonRepresentation {
                name: name.to_string(),
                reason: e.to_string(),
            }),
    }
}
