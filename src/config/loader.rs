// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accessor::PortOptions;
use crate::config::consts::{ENDPOINT_SEPARATOR, TOML_EXTENSIONS};
use crate::errors::ConfigError;
use crate::observability::messages::config::{ConfigLoaded, ConfigValidationFailed};
use crate::observability::messages::StructuredLog;
use crate::traits::SourceProvider;

/// A swarmlet: a top-level composite accessor described in a file.
///
/// # Fields
/// * `name` - Name of the top-level accessor
/// * `trusted` - Whether accessors may enumerate the top-level registry
/// * `inputs`, `outputs`, `parameters` - Ports of the composite, keyed by name
/// * `accessors` - Contained accessors, in instantiation order
/// * `connections` - Wiring between the composite and its contained accessors
///
/// # Example
/// ```yaml
/// name: pipeline
/// inputs:  { input: { type: number } }
/// outputs: { output: { type: number } }
/// accessors:
///   - name: doubler
///     class: math/Scale
///     parameters: { factor: 2 }
///   - name: offset
///     class: math/Offset
///     parameters: { offset: 5 }
/// connections:
///   - { from: input,          to: doubler.input }
///   - { from: doubler.output, to: offset.input }
///   - { from: offset.output,  to: output }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmletConfig {
    pub name: String,
    #[serde(default)]
    pub trusted: bool,
    #[serde(default)]
    pub inputs: BTreeMap<String, PortOptions>,
    #[serde(default)]
    pub outputs: BTreeMap<String, PortOptions>,
    #[serde(default)]
    pub parameters: BTreeMap<String, PortOptions>,
    #[serde(default)]
    pub accessors: Vec<AccessorConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// One contained accessor of a swarmlet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessorConfig {
    pub name: String,
    pub class: String,
    /// Parameter values applied after `setup`.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    /// Input defaults applied after `setup`.
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
}

/// A connection between two endpoints.
///
/// An endpoint is either a port of the swarmlet itself (`input`) or a port of a
/// contained accessor (`doubler.input`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub from: String,
    pub to: String,
}

/// A parsed connection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// A port of the swarmlet.
    Container(&'a str),
    /// A port of a contained accessor.
    Accessor { accessor: &'a str, port: &'a str },
}

impl<'a> Endpoint<'a> {
    pub fn parse(text: &'a str) -> Self {
        match text.split_once(ENDPOINT_SEPARATOR) {
            Some((accessor, port)) => Endpoint::Accessor { accessor, port },
            None => Endpoint::Container(text),
        }
    }
}

impl ConnectionConfig {
    pub fn source(&self) -> Endpoint<'_> {
        Endpoint::parse(&self.from)
    }

    pub fn destination(&self) -> Endpoint<'_> {
        Endpoint::parse(&self.to)
    }
}

/// Serialization format of a swarmlet file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// TOML for `.toml` files, YAML for everything else.
    pub fn from_path(path: &Path) -> Self {
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| TOML_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_toml {
            ConfigFormat::Toml
        } else {
            ConfigFormat::Yaml
        }
    }
}

/// Parse a swarmlet from text.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<SwarmletConfig, ConfigError> {
    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(config)
}

/// Load a swarmlet from a YAML or TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SwarmletConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = parse_config(&content, ConfigFormat::from_path(path))?;

    ConfigLoaded {
        path: &path.display().to_string(),
        name: &config.name,
        accessors: config.accessors.len(),
        connections: config.connections.len(),
    }
    .log();
    Ok(config)
}

/// Load a swarmlet and validate it.
///
/// When `provider` is given, accessor classes are checked against it as well.
pub fn load_and_validate_config<P: AsRef<Path>>(
    path: P,
    provider: Option<&dyn SourceProvider>,
) -> Result<SwarmletConfig, ConfigError> {
    let path = path.as_ref();
    let config = load_config(path)?;

    if let Err(errors) = crate::config::validate_swarmlet(&config, provider) {
        ConfigValidationFailed {
            path: &path.display().to_string(),
            errors: &errors,
        }
        .log();
        return Err(ConfigError::Invalid(errors));
    }
    Ok(config)
}
