// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Port model: declared options, runtime slots and connection bookkeeping.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::accessor::WeakAccessor;

/// Declared type of a port.
///
/// Unrecognised type names are kept as [`PortType::Other`] and coerced like `JSON`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortType {
    String,
    Number,
    Int,
    Boolean,
    Json,
    Other(String),
}

impl PortType {
    pub fn as_str(&self) -> &str {
        match self {
            PortType::String => "string",
            PortType::Number => "number",
            PortType::Int => "int",
            PortType::Boolean => "boolean",
            PortType::Json => "JSON",
            PortType::Other(name) => name,
        }
    }
}

impl From<&str> for PortType {
    fn from(name: &str) -> Self {
        match name {
            "string" => PortType::String,
            "number" => PortType::Number,
            "int" => PortType::Int,
            "boolean" => PortType::Boolean,
            "JSON" => PortType::Json,
            other => PortType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for PortType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PortType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(PortType::from(name.as_str()))
    }
}

/// Options declared for a port.
///
/// Later declarations of the same port are merged over earlier ones with
/// [`PortOptions::merge`]: options set in the newer declaration win, options it leaves
/// out are kept.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use swarmlet::accessor::{PortOptions, PortType};
///
/// let base = PortOptions::typed(PortType::Number).with_value(json!(1));
/// let newer = PortOptions::default().with_value(json!(2));
///
/// let merged = base.merge(newer);
/// assert_eq!(merged.port_type, Some(PortType::Number));
/// assert_eq!(merged.value, Some(json!(2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortOptions {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub port_type: Option<PortType>,
    /// Default value for inputs, initial value for parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Outputs only: produced by a callback rather than in response to an input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spontaneous: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other option, kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PortOptions {
    pub fn typed(port_type: PortType) -> Self {
        Self {
            port_type: Some(port_type),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn spontaneous(mut self) -> Self {
        self.spontaneous = Some(true);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_spontaneous(&self) -> bool {
        self.spontaneous.unwrap_or(false)
    }

    /// Overlay `newer` on top of `self`.
    pub fn merge(mut self, newer: PortOptions) -> PortOptions {
        if newer.port_type.is_some() {
            self.port_type = newer.port_type;
        }
        if newer.value.is_some() {
            self.value = newer.value;
        }
        if newer.spontaneous.is_some() {
            self.spontaneous = newer.spontaneous;
        }
        if newer.description.is_some() {
            self.description = newer.description;
        }
        self.extra.extend(newer.extra);
        self
    }
}

/// Where a connection delivers values.
#[derive(Debug, Clone)]
pub enum Destination {
    /// An input of another accessor (a sibling, or a contained accessor when the
    /// source is an input of the container).
    Input { accessor: WeakAccessor, input: String },
    /// On an input: an output of the same accessor. On an output: an output of the
    /// container.
    Output(String),
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Destination::Input { accessor, input },
                Destination::Input {
                    accessor: other_accessor,
                    input: other_input,
                },
            ) => accessor.ptr_eq(other_accessor) && input == other_input,
            (Destination::Output(a), Destination::Output(b)) => a == b,
            _ => false,
        }
    }
}

/// What feeds an input or output.
#[derive(Debug, Clone)]
pub enum Source {
    /// An output of another accessor.
    Output { accessor: WeakAccessor, output: String },
    /// An input of the accessor that owns the port (pass-through), or of the container
    /// (for a contained accessor's input).
    Input(String),
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Source::Output { accessor, output },
                Source::Output {
                    accessor: other_accessor,
                    output: other_output,
                },
            ) => accessor.ptr_eq(other_accessor) && output == other_output,
            (Source::Input(a), Source::Input(b)) => a == b,
            _ => false,
        }
    }
}

/// Runtime state of one port.
#[derive(Debug, Clone, Default)]
pub struct Port {
    pub options: PortOptions,
    /// Value provided in the current reaction (inputs) or the set value (parameters).
    pub current: Option<Value>,
    /// Input has a value whose handlers have not run yet.
    pub pending: bool,
    /// Values provided while the input was still pending, oldest first.
    pub queued: VecDeque<Value>,
    pub source: Option<Source>,
    pub destinations: Vec<Destination>,
    /// Outputs only: last value sent.
    pub latest: Option<Value>,
}

impl Port {
    pub fn new(options: PortOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn port_type(&self) -> Option<&PortType> {
        self.options.port_type.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.options.value.as_ref().filter(|value| !value.is_null())
    }
}

/// Ordered collection of ports of one kind.
#[derive(Debug, Clone, Default)]
pub struct PortTable {
    names: Vec<String>,
    ports: HashMap<String, Port>,
}

impl PortTable {
    /// Declare `name`, or merge `options` into an existing declaration.
    ///
    /// A redeclared port keeps its position in [`PortTable::names`].
    pub fn declare(&mut self, name: &str, options: PortOptions) {
        match self.ports.get_mut(name) {
            Some(port) => {
                let old = std::mem::take(&mut port.options);
                port.options = old.merge(options);
            }
            None => {
                self.names.push(name.to_string());
                self.ports.insert(name.to_string(), Port::new(options));
            }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// Ports in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Port)> + '_ {
        self.names
            .iter()
            .filter_map(move |name| self.ports.get(name).map(|port| (name, port)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Port> + '_ {
        self.ports.values_mut()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
