// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use crate::accessor::{Accessor, Connection};
use crate::config::{Endpoint, SwarmletConfig};
use crate::engine::Runtime;
use crate::errors::{ConfigError, EngineError, EngineResult};
use crate::observability::messages::config::SwarmletBuilt;
use crate::observability::messages::StructuredLog;
use crate::traits::AccessorDefinition;

/// Definition of the composite described by a swarmlet file.
///
/// Its `setup` declares the swarmlet's own ports, instantiates the contained accessors,
/// applies their parameter values and input defaults and wires the connections.
pub struct SwarmletDefinition {
    config: SwarmletConfig,
}

impl SwarmletDefinition {
    pub fn new(config: SwarmletConfig) -> Self {
        Self { config }
    }

    fn contained(this: &Accessor, name: &str) -> EngineResult<Accessor> {
        this.contained(name).ok_or_else(|| EngineError::NotFound {
            class: format!("{}.{}", this.name(), name),
        })
    }

    fn connection(this: &Accessor, from: Endpoint<'_>, to: Endpoint<'_>) -> EngineResult<Connection> {
        let connection = match (from, to) {
            (Endpoint::Container(input), Endpoint::Container(output)) => {
                Connection::pass_through(input, output)
            }
            (Endpoint::Container(input), Endpoint::Accessor { accessor, port }) => {
                Connection::input_to_contained(input, &Self::contained(this, accessor)?, port)
            }
            (Endpoint::Accessor { accessor, port }, Endpoint::Container(output)) => {
                Connection::contained_to_output(&Self::contained(this, accessor)?, port, output)
            }
            (
                Endpoint::Accessor { accessor, port },
                Endpoint::Accessor {
                    accessor: destination,
                    port: input,
                },
            ) => Connection::peer(
                &Self::contained(this, accessor)?,
                port,
                &Self::contained(this, destination)?,
                input,
            ),
        };
        Ok(connection)
    }
}

impl AccessorDefinition for SwarmletDefinition {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        for (name, options) in &self.config.inputs {
            this.input(name, options.clone())?;
        }
        for (name, options) in &self.config.outputs {
            this.output(name, options.clone())?;
        }
        for (name, options) in &self.config.parameters {
            this.parameter(name, options.clone())?;
        }

        for accessor in &self.config.accessors {
            let child = this.instantiate(&accessor.name, &accessor.class)?;
            for (name, value) in &accessor.parameters {
                child.set_parameter(name, value.clone())?;
            }
            for (name, value) in &accessor.inputs {
                child.set_default(name, value.clone())?;
            }
        }

        for connection in &self.config.connections {
            let connection = Self::connection(this, connection.source(), connection.destination())?;
            this.connect(connection)?;
        }
        Ok(())
    }
}

/// Swarmlet builder - turns a validated configuration into a top-level accessor.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use serde_json::json;
/// use swarmlet::backends::local::LibrarySourceProvider;
/// use swarmlet::backends::timers::ManualTimers;
/// use swarmlet::config::{parse_config, ConfigFormat, SwarmletBuilder};
/// use swarmlet::engine::Runtime;
///
/// let config = parse_config(
///     r#"
/// name: doubler
/// inputs: { input: { type: number } }
/// outputs: { output: { type: number } }
/// accessors:
///   - { name: scale, class: math/Scale, parameters: { factor: 2 } }
/// connections:
///   - { from: input, to: scale.input }
///   - { from: scale.output, to: output }
/// "#,
///     ConfigFormat::Yaml,
/// )
/// .unwrap();
///
/// let timers = Rc::new(ManualTimers::new());
/// let mut runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), timers.clone());
/// let swarmlet = SwarmletBuilder::build(&config, &mut runtime).unwrap();
///
/// swarmlet.initialize().unwrap();
/// swarmlet.provide_input("input", json!(21)).unwrap();
/// timers.run_until_idle();
/// assert_eq!(swarmlet.latest_output("output").unwrap(), json!(42));
/// ```
pub struct SwarmletBuilder;

impl SwarmletBuilder {
    /// Instantiate the swarmlet as a top-level accessor of `runtime`.
    ///
    /// The host trust flag follows the configuration. The accessor is not initialized.
    pub fn build(config: &SwarmletConfig, runtime: &mut Runtime) -> Result<Accessor, ConfigError> {
        runtime.host().set_trusted(config.trusted);
        let definition = Rc::new(SwarmletDefinition::new(config.clone()));
        let swarmlet = runtime.instantiate_definition(&config.name, definition)?;

        SwarmletBuilt {
            name: swarmlet.name(),
            accessors: swarmlet.contained_accessors().len(),
            connections: config.connections.len(),
            trusted: config.trusted,
        }
        .log();
        Ok(swarmlet)
    }
}
