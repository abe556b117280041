// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Accessor instances: the unit of composition.
//!
//! An [`Accessor`] is a cheap, clonable handle to one instance. It owns its ports, its
//! contained accessors (for composites), input handler registrations, timers and lifecycle
//! state. Contained accessors refer back to their container, and connection peers refer
//! to each other, through [`WeakAccessor`] so that ownership always flows from a container
//! to its children and from the [`crate::engine::Runtime`] to the top-level accessors.
//!
//! Execution is single-threaded and cooperative. No internal borrow is held while user
//! code (hooks, handlers, listeners, timer callbacks) runs, so that code is free to call
//! back into any accessor.
//!
//! # Inheritance
//!
//! Each instance keeps an ordered stack of layers. Layer 0 is the definition the instance
//! was created from. `extend` and `implement`, called from a `setup` hook, push further
//! layers whose `setup` declares ports into the same namespaces. A layer may extend at
//! most one base. The lifecycle hooks of layer 0 are the ones the engine calls; a
//! definition reaches its base through [`Accessor::invoke_base`].

mod coercion;
mod connections;
mod events;
mod handlers;
mod lifecycle;
mod ports;
mod reify;

pub use coercion::{coerce, is_truthy};
pub use connections::Connection;
pub use events::{AccessorEvent, EventKind, Listener, ListenerId};
pub use handlers::{BoundHandler, HandlerFn, HandlerHandle};
pub use ports::{Destination, Port, PortOptions, PortTable, PortType, Source};
pub use reify::{ReifyBundle, ReifyTarget};

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::engine::{EventQueue, Host};
use crate::errors::{EngineError, EngineResult, Hook, PortKind};
use crate::observability::messages::accessor::AccessorInstantiated;
use crate::observability::messages::StructuredLog;
use crate::traits::{AccessorDefinition, TimerHandle};

use events::EventListeners;
use handlers::HandlerRegistry;
use reify::Reification;

/// Class name given to instances created from inline definitions.
pub const CUSTOM_CLASS: &str = "custom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerRelation {
    Root,
    Extends(usize),
    Implements(usize),
}

struct Layer {
    class: String,
    definition: Rc<dyn AccessorDefinition>,
    relation: LayerRelation,
}

struct AccessorState {
    inputs: PortTable,
    outputs: PortTable,
    parameters: PortTable,
    layers: Vec<Layer>,
    setup_stack: Vec<usize>,
    container: Option<WeakAccessor>,
    children: Vec<Accessor>,
    priority: Option<i64>,
    initialized: bool,
    queue: EventQueue<Accessor>,
    react_requested: bool,
    reacting: bool,
    handlers: HandlerRegistry,
    listeners: EventListeners,
    timers: Vec<TimerHandle>,
    mutable: bool,
    reification: Option<Reification>,
}

impl AccessorState {
    fn new(
        class: String,
        definition: Rc<dyn AccessorDefinition>,
        container: Option<WeakAccessor>,
    ) -> Self {
        Self {
            inputs: PortTable::default(),
            outputs: PortTable::default(),
            parameters: PortTable::default(),
            layers: vec![Layer {
                class,
                definition,
                relation: LayerRelation::Root,
            }],
            setup_stack: Vec::new(),
            container,
            children: Vec::new(),
            priority: None,
            initialized: false,
            queue: EventQueue::new(),
            react_requested: false,
            reacting: false,
            handlers: HandlerRegistry::default(),
            listeners: EventListeners::default(),
            timers: Vec::new(),
            mutable: false,
            reification: None,
        }
    }

    fn table(&self, kind: PortKind) -> &PortTable {
        match kind {
            PortKind::Input => &self.inputs,
            PortKind::Output => &self.outputs,
            PortKind::Parameter => &self.parameters,
        }
    }

    fn table_mut(&mut self, kind: PortKind) -> &mut PortTable {
        match kind {
            PortKind::Input => &mut self.inputs,
            PortKind::Output => &mut self.outputs,
            PortKind::Parameter => &mut self.parameters,
        }
    }

    fn root_definition(&self) -> Rc<dyn AccessorDefinition> {
        self.layers[0].definition.clone()
    }
}

struct AccessorInner {
    name: String,
    class: String,
    host: Rc<Host>,
    state: RefCell<AccessorState>,
}

/// Handle to an accessor instance.
#[derive(Clone)]
pub struct Accessor {
    inner: Rc<AccessorInner>,
}

/// Non-owning reference to an accessor.
#[derive(Clone)]
pub struct WeakAccessor(Weak<AccessorInner>);

impl WeakAccessor {
    pub fn upgrade(&self) -> Option<Accessor> {
        self.0.upgrade().map(|inner| Accessor { inner })
    }

    pub fn ptr_eq(&self, other: &WeakAccessor) -> bool {
        self.0.ptr_eq(&other.0)
    }

    pub fn points_to(&self, accessor: &Accessor) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&accessor.inner))
    }
}

impl fmt::Debug for WeakAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(accessor) => write!(f, "WeakAccessor({})", accessor.name()),
            None => write!(f, "WeakAccessor(<dropped>)"),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.inner.name)
            .field("class", &self.inner.class)
            .finish()
    }
}

impl PartialEq for Accessor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Accessor {}

fn thin_ptr<T: ?Sized>(value: *const T) -> *const () {
    value as *const ()
}

impl Accessor {
    /// Build an instance and run the `setup` hook of `definition`.
    pub(crate) fn create(
        name: String,
        class: String,
        definition: Rc<dyn AccessorDefinition>,
        host: Rc<Host>,
        container: Option<WeakAccessor>,
    ) -> EngineResult<Accessor> {
        let accessor = Accessor {
            inner: Rc::new(AccessorInner {
                name,
                class: class.clone(),
                host,
                state: RefCell::new(AccessorState::new(class.clone(), definition.clone(), container)),
            }),
        };
        accessor.run_setup(0, &class, &definition)?;

        let state = accessor.state();
        AccessorInstantiated {
            name: accessor.name(),
            class: &class,
            inputs: state.inputs.len(),
            outputs: state.outputs.len(),
            parameters: state.parameters.len(),
        }
        .log();
        drop(state);
        Ok(accessor)
    }

    fn run_setup(
        &self,
        layer: usize,
        class: &str,
        definition: &Rc<dyn AccessorDefinition>,
    ) -> EngineResult<()> {
        self.state_mut().setup_stack.push(layer);
        let result = definition.setup(self);
        self.state_mut().setup_stack.pop();
        result.map_err(|source| match source.downcast::<EngineError>() {
            Ok(engine) => engine,
            Err(source) => EngineError::Setup {
                accessor: self.name().to_string(),
                class: class.to_string(),
                source,
            },
        })
    }

    fn state(&self) -> Ref<'_, AccessorState> {
        self.inner.state.borrow()
    }

    fn state_mut(&self) -> RefMut<'_, AccessorState> {
        self.inner.state.borrow_mut()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn class(&self) -> &str {
        &self.inner.class
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.inner.host
    }

    pub fn downgrade(&self) -> WeakAccessor {
        WeakAccessor(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Accessor) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn priority(&self) -> Option<i64> {
        self.state().priority
    }

    fn set_priority(&self, priority: Option<i64>) {
        self.state_mut().priority = priority;
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn container(&self) -> Option<Accessor> {
        self.state().container.as_ref().and_then(WeakAccessor::upgrade)
    }

    fn set_container(&self, container: Option<WeakAccessor>) {
        self.state_mut().container = container;
    }

    pub fn contained_accessors(&self) -> Vec<Accessor> {
        self.state().children.clone()
    }

    /// Contained accessor by instance name (`gain`) or full name (`top.gain`).
    pub fn contained(&self, name: &str) -> Option<Accessor> {
        let full = format!("{}.{}", self.name(), name);
        self.state()
            .children
            .iter()
            .find(|child| child.name() == name || child.name() == full)
            .cloned()
    }

    pub fn input_names(&self) -> Vec<String> {
        self.state().inputs.names().to_vec()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.state().outputs.names().to_vec()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.state().parameters.names().to_vec()
    }

    pub fn port_options(&self, kind: PortKind, name: &str) -> Option<PortOptions> {
        self.state().table(kind).get(name).map(|port| port.options.clone())
    }

    pub fn has_port(&self, kind: PortKind, name: &str) -> bool {
        self.state().table(kind).contains(name)
    }

    /// Source recorded on an input or output, for inspecting the wiring.
    pub fn port_source(&self, kind: PortKind, name: &str) -> Option<Source> {
        self.state().table(kind).get(name).and_then(|port| port.source.clone())
    }

    /// Destinations recorded on an input or output.
    pub fn port_destinations(&self, kind: PortKind, name: &str) -> Vec<Destination> {
        self.state()
            .table(kind)
            .get(name)
            .map(|port| port.destinations.clone())
            .unwrap_or_default()
    }

    fn unknown(&self, kind: PortKind, name: &str) -> EngineError {
        EngineError::UnknownPort {
            accessor: self.name().to_string(),
            kind,
            name: name.to_string(),
        }
    }

    fn coercion_error(&self, source: crate::errors::CoercionError) -> EngineError {
        EngineError::Coercion {
            accessor: self.name().to_string(),
            source,
        }
    }

    fn declare(&self, kind: PortKind, name: &str, options: PortOptions) -> EngineResult<()> {
        let mut state = self.state_mut();
        let table = state.table_mut(kind);
        let mut merged = match table.get(name) {
            Some(port) => port.options.clone().merge(options),
            None => options,
        };
        if let Some(value) = merged.value.take() {
            let value = coerce(value, merged.port_type.as_ref(), name)
                .map_err(|e| self.coercion_error(e))?;
            merged.value = Some(value);
        }
        table.declare(name, merged);
        Ok(())
    }

    /// Declare an input, or update the options of an existing one.
    pub fn input(&self, name: &str, options: PortOptions) -> EngineResult<()> {
        self.declare(PortKind::Input, name, options)
    }

    /// Declare an output, or update the options of an existing one.
    pub fn output(&self, name: &str, options: PortOptions) -> EngineResult<()> {
        self.declare(PortKind::Output, name, options)
    }

    /// Declare a parameter, or update the options of an existing one.
    pub fn parameter(&self, name: &str, options: PortOptions) -> EngineResult<()> {
        self.declare(PortKind::Parameter, name, options)
    }

    /// Value of an input for the current reaction: the provided value, else the
    /// default, else null. Parameter names are accepted too.
    pub fn get(&self, name: &str) -> EngineResult<Value> {
        let state = self.state();
        if let Some(port) = state.inputs.get(name) {
            let value = port
                .current
                .clone()
                .or_else(|| port.default_value().cloned())
                .unwrap_or(Value::Null);
            return coerce(value, port.port_type(), name).map_err(|e| self.coercion_error(e));
        }
        if state.parameters.contains(name) {
            drop(state);
            return self.get_parameter(name);
        }
        Err(self.unknown(PortKind::Input, name))
    }

    pub fn get_parameter(&self, name: &str) -> EngineResult<Value> {
        let state = self.state();
        let port = state
            .parameters
            .get(name)
            .ok_or_else(|| self.unknown(PortKind::Parameter, name))?;
        let value = port
            .current
            .clone()
            .or_else(|| port.default_value().cloned())
            .unwrap_or(Value::Null);
        coerce(value, port.port_type(), name).map_err(|e| self.coercion_error(e))
    }

    pub fn set_parameter(&self, name: &str, value: Value) -> EngineResult<()> {
        let mut state = self.state_mut();
        let port = state
            .parameters
            .get_mut(name)
            .ok_or_else(|| self.unknown(PortKind::Parameter, name))?;
        let value = coerce(value, port.port_type(), name).map_err(|e| self.coercion_error(e))?;
        port.current = Some(value);
        Ok(())
    }

    /// Persistently replace the default value of an input. Triggers no handler.
    pub fn set_default(&self, name: &str, value: Value) -> EngineResult<()> {
        let mut state = self.state_mut();
        let port = state
            .inputs
            .get_mut(name)
            .ok_or_else(|| self.unknown(PortKind::Input, name))?;
        let value = coerce(value, port.port_type(), name).map_err(|e| self.coercion_error(e))?;
        port.options.value = Some(value);
        Ok(())
    }

    /// `set_default` for an input, `set_parameter` for a parameter.
    pub fn set(&self, name: &str, value: Value) -> EngineResult<()> {
        if self.has_port(PortKind::Input, name) {
            self.set_default(name, value)
        } else if self.has_port(PortKind::Parameter, name) {
            self.set_parameter(name, value)
        } else {
            Err(self.unknown(PortKind::Input, name))
        }
    }

    /// Last value sent through `name`, or null.
    pub fn latest_output(&self, name: &str) -> EngineResult<Value> {
        let state = self.state();
        let port = state
            .outputs
            .get(name)
            .ok_or_else(|| self.unknown(PortKind::Output, name))?;
        Ok(port.latest.clone().unwrap_or(Value::Null))
    }

    fn current_layer(&self, class: &str) -> EngineResult<usize> {
        self.state()
            .setup_stack
            .last()
            .copied()
            .ok_or_else(|| EngineError::NotInSetup {
                accessor: self.name().to_string(),
                class: class.to_string(),
            })
    }

    fn push_layer(
        &self,
        class: &str,
        relation: LayerRelation,
    ) -> EngineResult<(usize, Rc<dyn AccessorDefinition>)> {
        let definition = self.host().source().get_code(class)?;
        let mut state = self.state_mut();
        state.layers.push(Layer {
            class: class.to_string(),
            definition: definition.clone(),
            relation,
        });
        Ok((state.layers.len() - 1, definition))
    }

    /// Stack `class` as the base of the layer currently being set up and run its `setup`.
    pub fn extend(&self, class: &str) -> EngineResult<()> {
        let current = self.current_layer(class)?;
        let already_extends = self
            .state()
            .layers
            .iter()
            .any(|layer| layer.relation == LayerRelation::Extends(current));
        if already_extends {
            return Err(EngineError::DuplicateBase {
                accessor: self.name().to_string(),
                class: class.to_string(),
            });
        }
        let (index, definition) = self.push_layer(class, LayerRelation::Extends(current))?;
        self.run_setup(index, class, &definition)
    }

    /// Stack the interface `class` on the layer currently being set up and run its `setup`.
    pub fn implement(&self, class: &str) -> EngineResult<()> {
        let current = self.current_layer(class)?;
        let (index, definition) = self.push_layer(class, LayerRelation::Implements(current))?;
        self.run_setup(index, class, &definition)
    }

    /// Classes of all layers, root first.
    pub fn layer_classes(&self) -> Vec<String> {
        self.state()
            .layers
            .iter()
            .map(|layer| layer.class.clone())
            .collect()
    }

    /// Classes of the interfaces stacked on this instance.
    pub fn implemented_interfaces(&self) -> Vec<String> {
        self.state()
            .layers
            .iter()
            .filter(|layer| matches!(layer.relation, LayerRelation::Implements(_)))
            .map(|layer| layer.class.clone())
            .collect()
    }

    /// The definition that `definition` extends on this instance, if any.
    pub fn base_of<D: ?Sized>(&self, definition: &D) -> Option<Rc<dyn AccessorDefinition>> {
        let target = thin_ptr(definition as *const D);
        let state = self.state();
        let index = state
            .layers
            .iter()
            .position(|layer| thin_ptr(Rc::as_ptr(&layer.definition)) == target)?;
        state
            .layers
            .iter()
            .find(|layer| layer.relation == LayerRelation::Extends(index))
            .map(|layer| layer.definition.clone())
    }

    /// Run `hook` of the base that `definition` extends. A no-op without a base.
    pub fn invoke_base<D: ?Sized>(&self, definition: &D, hook: Hook) -> anyhow::Result<()> {
        match self.base_of(definition) {
            Some(base) => match hook {
                Hook::Initialize => base.initialize(self),
                Hook::Fire => base.fire(self),
                Hook::Wrapup => base.wrapup(self),
            },
            None => Ok(()),
        }
    }

    /// Mark this accessor as a mutable whose implementation is bound at run time.
    pub fn declare_mutable(&self) {
        self.state_mut().mutable = true;
    }

    pub fn is_mutable(&self) -> bool {
        self.state().mutable
    }

    /// Create a contained accessor from a class known to the source provider.
    pub fn instantiate(&self, instance_name: &str, class: &str) -> EngineResult<Accessor> {
        let definition = self.host().source().get_code(class)?;
        self.instantiate_with(instance_name, class, definition)
    }

    /// Create a contained accessor from an inline definition.
    pub fn instantiate_definition(
        &self,
        instance_name: &str,
        definition: Rc<dyn AccessorDefinition>,
    ) -> EngineResult<Accessor> {
        self.instantiate_with(instance_name, CUSTOM_CLASS, definition)
    }

    fn instantiate_with(
        &self,
        instance_name: &str,
        class: &str,
        definition: Rc<dyn AccessorDefinition>,
    ) -> EngineResult<Accessor> {
        let name = format!("{}.{}", self.name(), instance_name);
        if self.state().children.iter().any(|child| child.name() == name) {
            return Err(EngineError::DuplicateName {
                container: self.name().to_string(),
                name,
            });
        }
        let child = Accessor::create(
            name,
            class.to_string(),
            definition,
            self.host().clone(),
            Some(self.downgrade()),
        )?;
        self.adopt(&child)?;
        Ok(child)
    }

    /// Add `child` to the contained accessors. When this container is already running,
    /// priorities are recomputed and the child is initialized.
    fn adopt(&self, child: &Accessor) -> EngineResult<()> {
        child.set_container(Some(self.downgrade()));
        self.state_mut().children.push(child.clone());
        if self.is_initialized() {
            if let Err(error) = self.assign_priorities() {
                self.release(child);
                return Err(error);
            }
            child.initialize()?;
        }
        Ok(())
    }

    /// Remove `child` from the contained accessors without wrapping it up.
    fn release(&self, child: &Accessor) {
        {
            let mut state = self.state_mut();
            state.children.retain(|c| !c.ptr_eq(child));
            state.queue.remove(child);
        }
        child.set_container(None);
        child.set_priority(None);
    }

    /// Top-level accessors of the runtime. Requires a trusted host.
    pub fn top_level_accessors(&self) -> EngineResult<Vec<Accessor>> {
        if !self.host().is_trusted() {
            return Err(EngineError::NotTrusted {
                accessor: self.name().to_string(),
            });
        }
        Ok(self.host().top_level())
    }
}
