// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Connections between ports and priority assignment over them.

use crate::accessor::{Accessor, Destination, Source};
use crate::engine::PriorityGraph;
use crate::errors::{EngineError, EngineResult, PortKind};
use crate::observability::messages::scheduler::{CausalityLoopDetected, PrioritiesAssigned};
use crate::observability::messages::StructuredLog;

/// One edge of a composite's connection graph, as seen from the container.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use swarmlet::accessor::{Accessor, Connection};
/// use swarmlet::backends::local::LibrarySourceProvider;
/// use swarmlet::backends::timers::ManualTimers;
/// use swarmlet::engine::Runtime;
/// use swarmlet::traits::SetupFn;
///
/// let mut runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), Rc::new(ManualTimers::new()));
/// let top = runtime
///     .instantiate_definition("top", Rc::new(SetupFn::new(|this: &Accessor| {
///         let a = this.instantiate("a", "identity")?;
///         let b = this.instantiate("b", "identity")?;
///         this.connect(Connection::peer(&a, "output", &b, "input"))?;
///         Ok(())
///     })))
///     .unwrap();
/// assert_eq!(top.contained_accessors().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub enum Connection {
    /// `source.output` feeds `destination.input`; both are contained accessors.
    Peer {
        source: Accessor,
        output: String,
        destination: Accessor,
        input: String,
    },
    /// An input of the container feeds an input of a contained accessor.
    InputToContained {
        input: String,
        destination: Accessor,
        destination_input: String,
    },
    /// An output of a contained accessor feeds an output of the container.
    ContainedToOutput {
        source: Accessor,
        output: String,
        container_output: String,
    },
    /// An input of the container feeds one of its own outputs.
    PassThrough { input: String, output: String },
}

impl Connection {
    pub fn peer(source: &Accessor, output: &str, destination: &Accessor, input: &str) -> Self {
        Connection::Peer {
            source: source.clone(),
            output: output.to_string(),
            destination: destination.clone(),
            input: input.to_string(),
        }
    }

    pub fn input_to_contained(input: &str, destination: &Accessor, destination_input: &str) -> Self {
        Connection::InputToContained {
            input: input.to_string(),
            destination: destination.clone(),
            destination_input: destination_input.to_string(),
        }
    }

    pub fn contained_to_output(source: &Accessor, output: &str, container_output: &str) -> Self {
        Connection::ContainedToOutput {
            source: source.clone(),
            output: output.to_string(),
            container_output: container_output.to_string(),
        }
    }

    pub fn pass_through(input: &str, output: &str) -> Self {
        Connection::PassThrough {
            input: input.to_string(),
            output: output.to_string(),
        }
    }
}

/// Resolved endpoints of a connection: the upstream port and the downstream port.
struct Endpoints {
    upstream: Accessor,
    upstream_kind: PortKind,
    upstream_port: String,
    downstream: Accessor,
    downstream_kind: PortKind,
    downstream_port: String,
    destination: Destination,
    source: Source,
}

impl Accessor {
    fn endpoints(&self, connection: &Connection) -> Endpoints {
        match connection {
            Connection::Peer {
                source,
                output,
                destination,
                input,
            } => Endpoints {
                upstream: source.clone(),
                upstream_kind: PortKind::Output,
                upstream_port: output.clone(),
                downstream: destination.clone(),
                downstream_kind: PortKind::Input,
                downstream_port: input.clone(),
                destination: Destination::Input {
                    accessor: destination.downgrade(),
                    input: input.clone(),
                },
                source: Source::Output {
                    accessor: source.downgrade(),
                    output: output.clone(),
                },
            },
            Connection::InputToContained {
                input,
                destination,
                destination_input,
            } => Endpoints {
                upstream: self.clone(),
                upstream_kind: PortKind::Input,
                upstream_port: input.clone(),
                downstream: destination.clone(),
                downstream_kind: PortKind::Input,
                downstream_port: destination_input.clone(),
                destination: Destination::Input {
                    accessor: destination.downgrade(),
                    input: destination_input.clone(),
                },
                source: Source::Input(input.clone()),
            },
            Connection::ContainedToOutput {
                source,
                output,
                container_output,
            } => Endpoints {
                upstream: source.clone(),
                upstream_kind: PortKind::Output,
                upstream_port: output.clone(),
                downstream: self.clone(),
                downstream_kind: PortKind::Output,
                downstream_port: container_output.clone(),
                destination: Destination::Output(container_output.clone()),
                source: Source::Output {
                    accessor: source.downgrade(),
                    output: output.clone(),
                },
            },
            Connection::PassThrough { input, output } => Endpoints {
                upstream: self.clone(),
                upstream_kind: PortKind::Input,
                upstream_port: input.clone(),
                downstream: self.clone(),
                downstream_kind: PortKind::Output,
                downstream_port: output.clone(),
                destination: Destination::Output(output.clone()),
                source: Source::Input(input.clone()),
            },
        }
    }

    /// Every accessor a connection names, other than this container, must be one of its children.
    fn validate_containment(&self, connection: &Connection) -> EngineResult<()> {
        let named = match connection {
            Connection::Peer {
                source,
                destination,
                ..
            } => vec![source, destination],
            Connection::InputToContained { destination, .. } => vec![destination],
            Connection::ContainedToOutput { source, .. } => vec![source],
            Connection::PassThrough { .. } => Vec::new(),
        };
        for accessor in named {
            let contained = accessor
                .container()
                .map_or(false, |container| container.ptr_eq(self));
            if !contained {
                return Err(EngineError::NotContained {
                    accessor: accessor.name().to_string(),
                    container: self.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate_endpoints(&self, endpoints: &Endpoints) -> EngineResult<()> {
        if !endpoints
            .upstream
            .has_port(endpoints.upstream_kind, &endpoints.upstream_port)
        {
            return Err(endpoints
                .upstream
                .unknown(endpoints.upstream_kind, &endpoints.upstream_port));
        }
        if !endpoints
            .downstream
            .has_port(endpoints.downstream_kind, &endpoints.downstream_port)
        {
            return Err(endpoints
                .downstream
                .unknown(endpoints.downstream_kind, &endpoints.downstream_port));
        }
        Ok(())
    }

    /// Add a connection. Every port is validated before anything changes.
    pub fn connect(&self, connection: Connection) -> EngineResult<()> {
        self.validate_containment(&connection)?;
        let endpoints = self.endpoints(&connection);
        self.validate_endpoints(&endpoints)?;

        let downstream_has_source = endpoints
            .downstream
            .port_source(endpoints.downstream_kind, &endpoints.downstream_port)
            .is_some();
        if downstream_has_source {
            return Err(EngineError::AlreadyConnected {
                accessor: endpoints.downstream.name().to_string(),
                kind: endpoints.downstream_kind,
                port: endpoints.downstream_port.clone(),
            });
        }

        self.link(&endpoints);

        if matches!(connection, Connection::Peer { .. }) && self.is_initialized() {
            if let Err(error) = self.assign_priorities() {
                self.unlink(&endpoints);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Remove a connection previously added with [`Accessor::connect`].
    pub fn disconnect(&self, connection: Connection) -> EngineResult<()> {
        let endpoints = self.endpoints(&connection);
        self.validate_endpoints(&endpoints)?;

        let recorded_source = endpoints
            .downstream
            .port_source(endpoints.downstream_kind, &endpoints.downstream_port);
        let recorded_destination = endpoints
            .upstream
            .port_destinations(endpoints.upstream_kind, &endpoints.upstream_port)
            .contains(&endpoints.destination);
        if recorded_source.as_ref() != Some(&endpoints.source) || !recorded_destination {
            return Err(EngineError::NotConnected {
                accessor: endpoints.downstream.name().to_string(),
                kind: endpoints.downstream_kind,
                port: endpoints.downstream_port.clone(),
            });
        }

        self.unlink(&endpoints);

        if matches!(connection, Connection::Peer { .. }) && self.is_initialized() {
            self.assign_priorities()?;
        }
        Ok(())
    }

    fn link(&self, endpoints: &Endpoints) {
        {
            let mut state = endpoints.upstream.state_mut();
            if let Some(port) = state
                .table_mut(endpoints.upstream_kind)
                .get_mut(&endpoints.upstream_port)
            {
                port.destinations.push(endpoints.destination.clone());
            }
        }
        let mut state = endpoints.downstream.state_mut();
        if let Some(port) = state
            .table_mut(endpoints.downstream_kind)
            .get_mut(&endpoints.downstream_port)
        {
            port.source = Some(endpoints.source.clone());
        }
    }

    fn unlink(&self, endpoints: &Endpoints) {
        {
            let mut state = endpoints.upstream.state_mut();
            if let Some(port) = state
                .table_mut(endpoints.upstream_kind)
                .get_mut(&endpoints.upstream_port)
            {
                if let Some(index) = port
                    .destinations
                    .iter()
                    .position(|d| *d == endpoints.destination)
                {
                    port.destinations.remove(index);
                }
            }
        }
        let mut state = endpoints.downstream.state_mut();
        if let Some(port) = state
            .table_mut(endpoints.downstream_kind)
            .get_mut(&endpoints.downstream_port)
        {
            port.source = None;
        }
    }

    /// Graph of non-spontaneous connections between contained accessors.
    pub fn priority_graph(&self) -> PriorityGraph {
        let children = self.contained_accessors();
        let mut graph = PriorityGraph::new(children.iter().map(|c| c.name().to_string()).collect());

        for (from, child) in children.iter().enumerate() {
            let state = child.state();
            for (_, port) in state.outputs.iter() {
                if port.options.is_spontaneous() {
                    continue;
                }
                for destination in &port.destinations {
                    let Destination::Input { accessor, .. } = destination else {
                        continue;
                    };
                    if let Some(to) = children.iter().position(|c| accessor.points_to(c)) {
                        graph.add_edge(from, to);
                    }
                }
            }
        }
        graph
    }

    /// Recompute the priorities of the contained accessors.
    ///
    /// On a causality loop nothing is changed and the loop is reported.
    pub fn assign_priorities(&self) -> EngineResult<()> {
        let graph = self.priority_graph();
        let priorities = match graph.assign() {
            Ok(priorities) => priorities,
            Err(error) => {
                if let EngineError::CausalityLoop { cycle, .. } = &error {
                    CausalityLoopDetected {
                        container: self.name(),
                        cycle,
                    }
                    .log();
                }
                return Err(error);
            }
        };

        for (child, priority) in self.contained_accessors().iter().zip(&priorities) {
            child.set_priority(Some(*priority));
        }
        PrioritiesAssigned {
            container: self.name(),
            accessors: priorities.len(),
            edges: graph.edge_count(),
        }
        .log();
        Ok(())
    }
}
