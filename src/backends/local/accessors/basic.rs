// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::accessor::{Accessor, PortOptions, PortType};
use crate::traits::AccessorDefinition;

/// Forwards every input value to its output unchanged.
pub struct Identity;

impl Identity {
    pub const CLASS: &'static str = "identity";
}

impl AccessorDefinition for Identity {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.input("input", PortOptions::default())?;
        this.output("output", PortOptions::default())?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        this.add_input_handler(Some("input"), |this: &Accessor| {
            let value = this.get("input")?;
            this.send("output", value)?;
            Ok(())
        })?;
        Ok(())
    }
}

/// Writes every input value to the log, prefixed with the `label` parameter.
pub struct Logger;

impl Logger {
    pub const CLASS: &'static str = "util/Logger";
}

impl AccessorDefinition for Logger {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.input("input", PortOptions::default())?;
        this.parameter(
            "label",
            PortOptions::typed(PortType::String).with_value(Value::String(String::new())),
        )?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        this.add_input_handler(Some("input"), |this: &Accessor| {
            let value = this.get("input")?;
            let label = this.get_parameter("label")?;
            tracing::info!(
                accessor = this.name(),
                label = label.as_str().unwrap_or_default(),
                value = %value,
                "{}",
                value
            );
            Ok(())
        })?;
        Ok(())
    }
}

/// Accumulates input values and sends the whole history as a JSON array.
pub struct Collect;

impl Collect {
    pub const CLASS: &'static str = "util/Collect";
}

impl AccessorDefinition for Collect {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.input("input", PortOptions::default())?;
        this.output("output", PortOptions::typed(PortType::Json))?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        let history = Rc::new(RefCell::new(Vec::new()));
        this.add_input_handler(Some("input"), move |this: &Accessor| {
            let value = this.get("input")?;
            let snapshot = {
                let mut history = history.borrow_mut();
                history.push(value);
                Value::Array(history.clone())
            };
            this.send("output", snapshot)?;
            Ok(())
        })?;
        Ok(())
    }
}
