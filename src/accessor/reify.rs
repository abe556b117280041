// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Binding a mutable accessor's interface to a concrete accessor at run time.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::accessor::{Accessor, AccessorEvent, Connection, PortType, CUSTOM_CLASS};
use crate::errors::{EngineError, EngineResult, PortKind};
use crate::observability::messages::reification::{
    ReificationCompleted, ReificationRejected, ReificationReleased, ReificationRollbackFailed,
};
use crate::observability::messages::StructuredLog;
use crate::traits::AccessorDefinition;

/// What to bind a mutable to.
#[derive(Clone)]
pub enum ReifyTarget {
    /// An existing accessor that is not contained elsewhere.
    Instance(Accessor),
    /// A class known to the source provider.
    Class(String),
    /// An inline definition.
    Definition(Rc<dyn AccessorDefinition>),
    /// Any of the above plus parameter values and input defaults to apply.
    Bundle(ReifyBundle),
}

impl fmt::Debug for ReifyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReifyTarget::Instance(accessor) => write!(f, "Instance({})", accessor.name()),
            ReifyTarget::Class(class) => write!(f, "Class({})", class),
            ReifyTarget::Definition(_) => write!(f, "Definition(..)"),
            ReifyTarget::Bundle(bundle) => f
                .debug_struct("Bundle")
                .field("target", &bundle.target)
                .field("parameters", &bundle.parameters)
                .field("inputs", &bundle.inputs)
                .finish(),
        }
    }
}

/// A reification target with overrides.
#[derive(Debug, Clone)]
pub struct ReifyBundle {
    pub target: Box<ReifyTarget>,
    /// Parameter values set on the candidate.
    pub parameters: BTreeMap<String, Value>,
    /// Input defaults set on the candidate.
    pub inputs: BTreeMap<String, Value>,
}

impl ReifyBundle {
    pub fn new(target: ReifyTarget) -> Self {
        Self {
            target: Box::new(target),
            parameters: BTreeMap::new(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: Value) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    pub fn with_input(mut self, name: &str, value: Value) -> Self {
        self.inputs.insert(name.to_string(), value);
        self
    }
}

/// The active binding of a mutable.
pub(crate) struct Reification {
    accessor: Accessor,
    connections: Vec<Connection>,
}

/// Ports of the mutable that line up with ports of a candidate.
struct Mapping {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

fn types_differ(a: Option<PortType>, b: Option<PortType>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}

impl Accessor {
    pub fn is_reified(&self) -> bool {
        self.state().reification.is_some()
    }

    /// The accessor this mutable is currently bound to.
    pub fn reified_accessor(&self) -> Option<Accessor> {
        self.state()
            .reification
            .as_ref()
            .map(|reification| reification.accessor.clone())
    }

    /// Inputs with a shared name and compatible types are wired; a shared output with
    /// two declared, different types makes the candidate incompatible.
    fn compatibility(&self, candidate: &Accessor) -> Result<Mapping, String> {
        let mut inputs = Vec::new();
        for name in self.input_names() {
            let Some(theirs) = candidate.port_options(PortKind::Input, &name) else {
                continue;
            };
            let mine = self.port_options(PortKind::Input, &name).and_then(|o| o.port_type);
            if !types_differ(mine, theirs.port_type) {
                inputs.push(name);
            }
        }

        let mut outputs = Vec::new();
        for name in self.output_names() {
            let Some(theirs) = candidate.port_options(PortKind::Output, &name) else {
                continue;
            };
            let mine = self.port_options(PortKind::Output, &name).and_then(|o| o.port_type);
            if types_differ(mine, theirs.port_type) {
                return Err(name);
            }
            outputs.push(name);
        }

        Ok(Mapping { inputs, outputs })
    }

    /// Whether `candidate` could be bound to this mutable. Has no side effects.
    pub fn is_reifiable_by(&self, candidate: &Accessor) -> bool {
        self.is_mutable() && self.compatibility(candidate).is_ok()
    }

    fn resolve_candidate(&self, target: ReifyTarget) -> EngineResult<Accessor> {
        match target {
            ReifyTarget::Instance(accessor) => {
                if let Some(container) = accessor.container() {
                    if !container.ptr_eq(self) {
                        return Err(EngineError::AlreadyContained {
                            accessor: accessor.name().to_string(),
                            container: container.name().to_string(),
                        });
                    }
                }
                Ok(accessor)
            }
            ReifyTarget::Class(class) => {
                let definition = self.host().source().get_code(&class)?;
                let instance = class.rsplit('/').next().unwrap_or(&class);
                Accessor::create(
                    format!("{}.{}", self.name(), instance),
                    class.clone(),
                    definition,
                    self.host().clone(),
                    None,
                )
            }
            ReifyTarget::Definition(definition) => Accessor::create(
                format!("{}.{}", self.name(), CUSTOM_CLASS),
                CUSTOM_CLASS.to_string(),
                definition,
                self.host().clone(),
                None,
            ),
            ReifyTarget::Bundle(bundle) => self.resolve_candidate(*bundle.target),
        }
    }

    /// Bind this mutable to `target`.
    ///
    /// Returns `Ok(false)`, with nothing changed, when a shared output has a
    /// conflicting declared type. A previous binding is released first. Any failure
    /// while wiring the new binding leaves the mutable unbound.
    pub fn reify(&self, target: ReifyTarget) -> EngineResult<bool> {
        if !self.is_mutable() {
            return Err(EngineError::NotMutable {
                accessor: self.name().to_string(),
            });
        }

        let mut target = target;
        let mut parameters = BTreeMap::new();
        let mut inputs = BTreeMap::new();
        while let ReifyTarget::Bundle(bundle) = target {
            for (name, value) in bundle.parameters {
                parameters.entry(name).or_insert(value);
            }
            for (name, value) in bundle.inputs {
                inputs.entry(name).or_insert(value);
            }
            target = *bundle.target;
        }

        let candidate = self.resolve_candidate(target)?;
        let mapping = match self.compatibility(&candidate) {
            Ok(mapping) => mapping,
            Err(output) => {
                ReificationRejected {
                    mutable: self.name(),
                    candidate: candidate.name(),
                    output: &output,
                }
                .log();
                return Ok(false);
            }
        };

        if self.is_reified() {
            self.unreify()?;
        }

        candidate.set_container(Some(self.downgrade()));
        let already_child = self
            .state()
            .children
            .iter()
            .any(|child| child.ptr_eq(&candidate));
        if !already_child {
            self.state_mut().children.push(candidate.clone());
        }

        let mut connections = Vec::new();
        let wired = self.wire(&candidate, &mapping, &mut connections).and_then(|_| {
            self.assign_priorities()?;
            for (name, value) in &parameters {
                candidate.set_parameter(name, value.clone())?;
            }
            for (name, value) in &inputs {
                candidate.set_default(name, value.clone())?;
            }
            if self.is_initialized() {
                candidate.initialize()?;
            }
            Ok(())
        });

        if let Err(error) = wired {
            self.roll_back(&candidate, connections);
            self.release(&candidate);
            return Err(error);
        }

        self.state_mut().reification = Some(Reification {
            accessor: candidate.clone(),
            connections,
        });
        ReificationCompleted {
            mutable: self.name(),
            accessor: candidate.name(),
            inputs: mapping.inputs.len(),
            outputs: mapping.outputs.len(),
        }
        .log();
        self.emit(AccessorEvent::Reified {
            accessor: candidate.name().to_string(),
        });
        Ok(true)
    }

    /// Undo `connections` newest first. Returns how many could not be removed.
    fn roll_back(&self, candidate: &Accessor, connections: Vec<Connection>) -> usize {
        let mut failures = 0;
        for connection in connections.into_iter().rev() {
            if let Err(error) = self.disconnect(connection) {
                ReificationRollbackFailed {
                    mutable: self.name(),
                    accessor: candidate.name(),
                    error: &error.to_string(),
                }
                .log();
                failures += 1;
            }
        }
        failures
    }

    fn wire(
        &self,
        candidate: &Accessor,
        mapping: &Mapping,
        connections: &mut Vec<Connection>,
    ) -> EngineResult<()> {
        for name in &mapping.inputs {
            let connection = Connection::input_to_contained(name, candidate, name);
            self.connect(connection.clone())?;
            connections.push(connection);
        }
        for name in &mapping.outputs {
            let connection = Connection::contained_to_output(candidate, name, name);
            self.connect(connection.clone())?;
            connections.push(connection);
        }
        Ok(())
    }

    /// Release the current binding, if any, and wrap up the bound accessor.
    pub fn unreify(&self) -> EngineResult<()> {
        if !self.is_mutable() {
            return Err(EngineError::NotMutable {
                accessor: self.name().to_string(),
            });
        }
        let Some(reification) = self.state_mut().reification.take() else {
            return Ok(());
        };

        let mut first_error = None;
        for connection in reification.connections.into_iter().rev() {
            if let Err(error) = self.disconnect(connection) {
                first_error.get_or_insert(error);
            }
        }
        let accessor = reification.accessor;
        self.release(&accessor);
        if let Err(error) = accessor.wrapup() {
            first_error.get_or_insert(error);
        }
        if self.is_initialized() {
            if let Err(error) = self.assign_priorities() {
                first_error.get_or_insert(error);
            }
        }

        ReificationReleased {
            mutable: self.name(),
            accessor: accessor.name(),
        }
        .log();
        self.emit(AccessorEvent::Unreified {
            accessor: accessor.name().to_string(),
        });
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PortOptions;
    use crate::backends::local::LibrarySourceProvider;
    use crate::backends::timers::ManualTimers;
    use crate::engine::Runtime;
    use crate::traits::SetupFn;
    use serde_json::json;

    fn mutable(runtime: &mut Runtime) -> Accessor {
        runtime
            .instantiate_definition(
                "m",
                Rc::new(SetupFn::new(|this: &Accessor| {
                    this.declare_mutable();
                    this.input("input", PortOptions::typed(PortType::Number))?;
                    this.output("output", PortOptions::typed(PortType::Number))?;
                    Ok(())
                })),
            )
            .unwrap()
    }

    fn runtime() -> (Runtime, Rc<ManualTimers>) {
        let timers = Rc::new(ManualTimers::new());
        let runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), timers.clone());
        (runtime, timers)
    }

    #[test]
    fn test_reify_by_class_with_bundle() {
        let (mut runtime, timers) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();

        let bundle = ReifyBundle::new(ReifyTarget::Class("math/Scale".to_string()))
            .with_parameter("factor", json!(3));
        assert!(m.reify(ReifyTarget::Bundle(bundle)).unwrap());

        let scale = m.reified_accessor().unwrap();
        assert_eq!(scale.name(), "m.Scale");
        assert!(scale.is_initialized());

        m.provide_input("input", json!(2)).unwrap();
        timers.run_until_idle();
        assert_eq!(m.latest_output("output").unwrap(), json!(6));
    }

    struct Increment;

    impl AccessorDefinition for Increment {
        fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
            this.input("input", PortOptions::default())?;
            this.output("output", PortOptions::typed(PortType::Number))?;
            Ok(())
        }

        fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
            this.add_input_handler(Some("input"), |this: &Accessor| {
                let x = this.get("input")?.as_f64().unwrap_or(0.0);
                this.send("output", json!(x + 1.0))?;
                Ok(())
            })?;
            Ok(())
        }
    }

    #[test]
    fn test_reify_by_definition_forwards_through_mutable() {
        let (mut runtime, timers) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();

        let candidate = runtime.instantiate_definition("k", Rc::new(Increment)).unwrap();
        assert!(m.is_reifiable_by(&candidate));

        assert!(m.reify(ReifyTarget::Definition(Rc::new(Increment))).unwrap());
        assert!(m.is_reified());

        let events = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = events.clone();
        m.on(crate::accessor::EventKind::Output, move |event| {
            sink.borrow_mut().push(event.clone())
        });

        m.provide_input("input", json!(4)).unwrap();
        timers.run_until_idle();
        assert_eq!(m.latest_output("output").unwrap(), json!(5.0));
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_incompatible_output_type_is_refused() {
        let (mut runtime, _) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();

        let stringly = || {
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.input("input", PortOptions::default())?;
                this.output("output", PortOptions::typed(PortType::String))?;
                Ok(())
            }))
        };
        let candidate = runtime.instantiate_definition("k2", stringly()).unwrap();
        assert!(!m.is_reifiable_by(&candidate));

        assert!(!m.reify(ReifyTarget::Definition(stringly())).unwrap());
        assert!(!m.is_reified());
        assert!(m.contained_accessors().is_empty());
        assert!(m.port_destinations(PortKind::Input, "input").is_empty());
    }

    #[test]
    fn test_roll_back_reports_connections_it_cannot_remove() {
        let (mut runtime, _timers) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();
        assert!(m.reify(ReifyTarget::Class("math/Scale".to_string())).unwrap());
        let scale = m.reified_accessor().unwrap();

        let wired = Connection::input_to_contained("input", &scale, "input");
        let never_made = Connection::contained_to_output(&scale, "output", "input");
        assert_eq!(m.roll_back(&scale, vec![wired, never_made]), 1);
        assert!(scale.port_source(PortKind::Input, "input").is_none());
    }

    #[test]
    fn test_reify_requires_mutable() {
        let (mut runtime, _) = runtime();
        let plain = runtime.instantiate("plain", "identity").unwrap();
        assert!(matches!(
            plain.reify(ReifyTarget::Class("identity".to_string())),
            Err(EngineError::NotMutable { .. })
        ));
        assert!(matches!(plain.unreify(), Err(EngineError::NotMutable { .. })));
    }

    #[test]
    fn test_instance_contained_elsewhere() {
        let (mut runtime, _) = runtime();
        let m = mutable(&mut runtime);
        let other = runtime
            .instantiate_definition("other", Rc::new(SetupFn::new(|_: &Accessor| Ok(()))))
            .unwrap();
        let owned = other.instantiate("x", "identity").unwrap();

        assert!(matches!(
            m.reify(ReifyTarget::Instance(owned)),
            Err(EngineError::AlreadyContained { .. })
        ));
        assert!(m.contained_accessors().is_empty());
    }

    #[test]
    fn test_rereify_releases_previous_binding() {
        let (mut runtime, _) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();

        assert!(m.reify(ReifyTarget::Class("identity".to_string())).unwrap());
        let first = m.reified_accessor().unwrap();
        assert!(m.reify(ReifyTarget::Class("math/Offset".to_string())).unwrap());

        assert!(!first.is_initialized());
        assert!(first.container().is_none());
        assert_eq!(m.contained_accessors().len(), 1);
        assert_eq!(m.port_destinations(PortKind::Input, "input").len(), 1);
    }

    #[test]
    fn test_unreify_tears_down_wiring() {
        let (mut runtime, _) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();
        m.reify(ReifyTarget::Class("identity".to_string())).unwrap();

        m.unreify().unwrap();
        assert!(!m.is_reified());
        assert!(m.contained_accessors().is_empty());
        assert!(m.port_destinations(PortKind::Input, "input").is_empty());
        assert!(m.port_source(PortKind::Output, "output").is_none());
        assert!(m.unreify().is_ok());
    }

    #[test]
    fn test_wrapup_unreifies() {
        let (mut runtime, _) = runtime();
        let m = mutable(&mut runtime);
        m.initialize().unwrap();
        m.reify(ReifyTarget::Class("identity".to_string())).unwrap();

        m.wrapup().unwrap();
        assert!(!m.is_reified());
    }
}
