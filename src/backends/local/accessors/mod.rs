// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in accessor definitions.

pub mod basic;
pub mod math;
pub mod ramp;

pub use basic::*;
pub use math::*;
pub use ramp::*;

use serde_json::{json, Value};

/// Number value that stays integral when the result is a whole number.
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}
