// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::json;

use crate::accessor::{Accessor, PortOptions, PortType};
use crate::backends::local::accessors::number;
use crate::traits::AccessorDefinition;

/// Interface shared by single-input, single-output numeric accessors.
pub struct Transform;

impl Transform {
    pub const CLASS: &'static str = "interfaces/Transform";
}

impl AccessorDefinition for Transform {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.input("input", PortOptions::typed(PortType::Number))?;
        this.output("output", PortOptions::typed(PortType::Number))?;
        Ok(())
    }
}

/// Registers a handler on `input` that sends `f(input)` to `output`. Null inputs are
/// ignored.
fn transform_input<F>(this: &Accessor, f: F) -> anyhow::Result<()>
where
    F: Fn(&Accessor, f64) -> anyhow::Result<f64> + 'static,
{
    this.add_input_handler(Some("input"), move |this: &Accessor| {
        let Some(x) = this.get("input")?.as_f64() else {
            return Ok(());
        };
        let y = f(this, x)?;
        this.send("output", number(y))?;
        Ok(())
    })?;
    Ok(())
}

fn parameter_f64(this: &Accessor, name: &str) -> anyhow::Result<f64> {
    this.get_parameter(name)?
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("parameter '{}' of '{}' is not set", name, this.name()))
}

/// Multiplies its input by the `factor` parameter.
pub struct Scale;

impl Scale {
    pub const CLASS: &'static str = "math/Scale";
}

impl AccessorDefinition for Scale {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.implement(Transform::CLASS)?;
        this.parameter("factor", PortOptions::typed(PortType::Number).with_value(json!(1)))?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        transform_input(this, |this, x| Ok(x * parameter_f64(this, "factor")?))
    }
}

/// Adds the `offset` parameter to its input.
pub struct Offset;

impl Offset {
    pub const CLASS: &'static str = "math/Offset";
}

impl AccessorDefinition for Offset {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.implement(Transform::CLASS)?;
        this.parameter("offset", PortOptions::typed(PortType::Number).with_value(json!(0)))?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        transform_input(this, |this, x| Ok(x + parameter_f64(this, "offset")?))
    }
}

/// `factor * input + offset`, built on [`Scale`].
///
/// Keeps the ports and `factor` parameter of its base and replaces the base's
/// handler with its own.
pub struct Affine;

impl Affine {
    pub const CLASS: &'static str = "math/Affine";
}

impl AccessorDefinition for Affine {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.extend(Scale::CLASS)?;
        this.parameter("offset", PortOptions::typed(PortType::Number).with_value(json!(0)))?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        transform_input(this, |this, x| {
            Ok(x * parameter_f64(this, "factor")? + parameter_f64(this, "offset")?)
        })
    }
}

/// Sum of inputs `a` and `b`, sent once per reaction whichever of them changed.
pub struct Add;

impl Add {
    pub const CLASS: &'static str = "math/Add";
}

impl AccessorDefinition for Add {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.input("a", PortOptions::typed(PortType::Number).with_value(json!(0)))?;
        this.input("b", PortOptions::typed(PortType::Number).with_value(json!(0)))?;
        this.output("sum", PortOptions::typed(PortType::Number))?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        this.add_input_handler(None, |this: &Accessor| {
            let a = this.get("a")?.as_f64().unwrap_or(0.0);
            let b = this.get("b")?.as_f64().unwrap_or(0.0);
            this.send("sum", number(a + b))?;
            Ok(())
        })?;
        Ok(())
    }
}
