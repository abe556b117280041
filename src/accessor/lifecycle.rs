// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle, reactions and value propagation.
//!
//! A macro-step is one `react()` of a top-level accessor:
//!
//! 1. input handlers run for every pending input, repeatedly, until no input is pending
//! 2. handlers registered for any input run
//! 3. the event queue of contained accessors is drained, lowest priority first
//! 4. the `fire` hook runs
//! 5. provided input values are cleared
//!
//! Reactions are requested through the host timers with a zero delay, so a reaction never
//! starts inside the call that triggered it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;

use crate::accessor::events::Listener;
use crate::accessor::handlers::HandlerFn;
use crate::accessor::{
    coerce, Accessor, AccessorEvent, BoundHandler, Destination, EventKind, HandlerHandle,
    ListenerId,
};
use crate::errors::{EngineError, EngineResult, Hook, PortKind};
use crate::observability::messages::accessor::{
    AccessorInitialized, AccessorWrappedUp, InputHandlerFailed, OutputSent, ReactionCompleted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::TimerHandle;

impl Accessor {
    /// Assign priorities to contained accessors, initialize them, then run the
    /// `initialize` hook.
    ///
    /// Initializing twice re-assigns priorities and re-initializes the children.
    pub fn initialize(&self) -> EngineResult<()> {
        self.emit(AccessorEvent::InitializeStart);

        let children = self.contained_accessors();
        if !children.is_empty() {
            self.assign_priorities()?;
            self.state_mut().queue.clear();
            for child in &children {
                child.initialize()?;
            }
        }

        let definition = self.state().root_definition();
        definition.initialize(self).map_err(|source| EngineError::Hook {
            accessor: self.name().to_string(),
            hook: Hook::Initialize,
            source,
        })?;
        self.state_mut().initialized = true;

        AccessorInitialized {
            name: self.name(),
            children: children.len(),
            priority: self.priority(),
        }
        .log();
        self.emit(AccessorEvent::InitializeEnd);
        Ok(())
    }

    /// Release handlers and timers, unbind a mutable, wrap up contained accessors and run
    /// the `wrapup` hook.
    ///
    /// Safe to call without a prior `initialize`. Every step runs even when an earlier one
    /// fails; the first failure is returned.
    pub fn wrapup(&self) -> EngineResult<()> {
        self.emit(AccessorEvent::WrapupStart);

        let timers = {
            let mut state = self.state_mut();
            state.initialized = false;
            state.handlers.clear();
            state.react_requested = false;
            state.reacting = false;
            state.queue.clear();
            std::mem::take(&mut state.timers)
        };
        for handle in &timers {
            self.host().timers().cancel(*handle);
        }

        let mut first_error = None;
        if self.is_reified() {
            if let Err(error) = self.unreify() {
                first_error.get_or_insert(error);
            }
        }
        for child in self.contained_accessors() {
            if let Err(error) = child.wrapup() {
                first_error.get_or_insert(error);
            }
        }
        let definition = self.state().root_definition();
        if let Err(source) = definition.wrapup(self) {
            first_error.get_or_insert(EngineError::Hook {
                accessor: self.name().to_string(),
                hook: Hook::Wrapup,
                source,
            });
        }

        AccessorWrappedUp {
            name: self.name(),
            cancelled_timers: timers.len(),
        }
        .log();
        self.emit(AccessorEvent::WrapupEnd);
        first_error.map_or(Ok(()), Err)
    }

    /// Provide a value to an input for the next reaction.
    ///
    /// If the input already holds a value whose handlers have not run, the new value is
    /// queued behind it. Providing null to an input without a default records that there
    /// is no input and triggers nothing; while a value is pending such a null is dropped.
    pub fn provide_input(&self, name: &str, value: Value) -> EngineResult<()> {
        let (value, destinations) = {
            let mut state = self.state_mut();
            let port = state
                .inputs
                .get_mut(name)
                .ok_or_else(|| self.unknown(PortKind::Input, name))?;
            let value = coerce(value, port.port_type(), name).map_err(|e| self.coercion_error(e))?;

            let absent = value.is_null() && port.default_value().is_none();
            if port.pending {
                if absent {
                    return Ok(());
                }
                port.queued.push_back(value.clone());
            } else if absent {
                port.current = None;
                return Ok(());
            } else {
                port.current = if value.is_null() { None } else { Some(value.clone()) };
                port.pending = true;
            }
            (value, port.destinations.clone())
        };

        if let Some(container) = self.container() {
            container.schedule_event(self)?;
        }
        self.deliver(&value, destinations)
    }

    fn deliver(&self, value: &Value, destinations: Vec<Destination>) -> EngineResult<()> {
        for destination in destinations {
            match destination {
                Destination::Input { accessor, input } => {
                    if let Some(accessor) = accessor.upgrade() {
                        accessor.provide_input(&input, value.clone())?;
                    }
                }
                Destination::Output(output) => self.forward_to_output(&output, value)?,
            }
        }
        Ok(())
    }

    fn forward_to_output(&self, output: &str, value: &Value) -> EngineResult<()> {
        if self.has_port(PortKind::Output, output) {
            self.send(output, value.clone())
        } else if let Some(container) = self.container() {
            container.send(output, value.clone())
        } else {
            Ok(())
        }
    }

    /// Send a value through an output.
    ///
    /// When `name` is one of this accessor's own inputs instead, the value is provided to
    /// that input in the next reaction.
    pub fn send(&self, name: &str, value: Value) -> EngineResult<()> {
        let port_type = {
            let state = self.state();
            match state.outputs.get(name) {
                Some(port) => Some(port.options.port_type.clone()),
                None if state.inputs.contains(name) => None,
                None => return Err(self.unknown(PortKind::Output, name)),
            }
        };
        let Some(port_type) = port_type else {
            return self.send_to_own_input(name, value);
        };

        let value = coerce(value, port_type.as_ref(), name).map_err(|e| self.coercion_error(e))?;
        let destinations = {
            let mut state = self.state_mut();
            let port = state
                .outputs
                .get_mut(name)
                .ok_or_else(|| self.unknown(PortKind::Output, name))?;
            port.latest = Some(value.clone());
            port.destinations.clone()
        };

        OutputSent {
            accessor: self.name(),
            output: name,
            destinations: destinations.len(),
        }
        .log();
        self.emit(AccessorEvent::Output {
            name: name.to_string(),
            value: value.clone(),
        });

        for destination in destinations {
            match destination {
                Destination::Input { accessor, input } => {
                    if let Some(accessor) = accessor.upgrade() {
                        accessor.provide_input(&input, value.clone())?;
                    }
                }
                Destination::Output(output) => {
                    if let Some(container) = self.container() {
                        container.send(&output, value.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn send_to_own_input(&self, name: &str, value: Value) -> EngineResult<()> {
        let input = name.to_string();
        self.schedule_internal(Duration::ZERO, move |this| this.provide_input(&input, value));

        if self.container().is_none() {
            let request = {
                let mut state = self.state_mut();
                !std::mem::replace(&mut state.react_requested, true)
            };
            if request {
                self.request_reaction();
            }
        }
        Ok(())
    }

    /// Queue a reaction of `child`, a contained accessor of this one.
    pub fn schedule_event(&self, child: &Accessor) -> EngineResult<()> {
        let priority = child.priority();
        let (request, escalate) = {
            let mut state = self.state_mut();
            let priority = match priority {
                Some(priority) => priority,
                None if state.queue.is_empty() => i64::MIN,
                None => {
                    return Err(EngineError::Unprioritized {
                        accessor: child.name().to_string(),
                    })
                }
            };
            state.queue.schedule(child.clone(), priority);

            if state.reacting {
                (false, false)
            } else if state.container.is_some() {
                (false, true)
            } else {
                (!std::mem::replace(&mut state.react_requested, true), false)
            }
        };

        if request {
            self.request_reaction();
        }
        if escalate {
            if let Some(container) = self.container() {
                container.schedule_event(self)?;
            }
        }
        Ok(())
    }

    /// Whether `child` waits in this accessor's event queue.
    pub fn is_scheduled(&self, child: &Accessor) -> bool {
        self.state().queue.contains(child)
    }

    fn request_reaction(&self) {
        self.schedule_internal(Duration::ZERO, |this| this.react(None));
    }

    /// React to pending inputs, or only to `input` when given.
    pub fn react(&self, input: Option<&str>) -> EngineResult<()> {
        self.emit(AccessorEvent::ReactStart);
        {
            let mut state = self.state_mut();
            state.react_requested = false;
            state.reacting = true;
        }

        let result = self.react_inner(input);

        let mut state = self.state_mut();
        state.reacting = false;
        for port in state.inputs.iter_mut() {
            if !port.pending {
                port.current = None;
            }
        }
        drop(state);
        let result = result.and(self.resume_queued());

        ReactionCompleted {
            name: self.name(),
            succeeded: result.is_ok(),
        }
        .log();
        self.emit(AccessorEvent::ReactEnd);
        result
    }

    fn react_inner(&self, input: Option<&str>) -> EngineResult<()> {
        let mut first_error: Option<EngineError> = None;

        match input {
            Some(name) => {
                if !self.has_port(PortKind::Input, name) {
                    return Err(self.unknown(PortKind::Input, name));
                }
                self.take_pending(name);
                self.invoke_handlers(Some(name), &mut first_error);
                self.promote_queued(name);
            }
            None => loop {
                let mut handled_any = false;
                for name in self.input_names() {
                    if self.take_pending(&name) {
                        handled_any = true;
                        self.invoke_handlers(Some(&name), &mut first_error);
                        self.promote_queued(&name);
                    }
                }
                if !handled_any {
                    break;
                }
            },
        }
        self.invoke_handlers(None, &mut first_error);

        if let Some(error) = first_error.take() {
            return Err(error);
        }

        loop {
            let next = self.state_mut().queue.pop_front();
            let Some(child) = next else { break };
            if let Err(error) = child.react(None) {
                first_error.get_or_insert(error);
            }
        }
        self.state_mut().reacting = false;

        let definition = self.state().root_definition();
        let fired = definition.fire(self).map_err(|source| EngineError::Hook {
            accessor: self.name().to_string(),
            hook: Hook::Fire,
            source,
        });
        match first_error {
            Some(error) => Err(error),
            None => fired,
        }
    }

    /// Children still queued after a reaction stopped early get another reaction.
    fn resume_queued(&self) -> EngineResult<()> {
        if self.state().queue.is_empty() {
            return Ok(());
        }
        match self.container() {
            Some(container) => container.schedule_event(self),
            None => {
                let request = !std::mem::replace(&mut self.state_mut().react_requested, true);
                if request {
                    self.request_reaction();
                }
                Ok(())
            }
        }
    }

    fn take_pending(&self, input: &str) -> bool {
        let mut state = self.state_mut();
        match state.inputs.get_mut(input) {
            Some(port) => std::mem::replace(&mut port.pending, false),
            None => false,
        }
    }

    /// After the handlers for one value ran, make the next queued value current.
    fn promote_queued(&self, input: &str) {
        let mut state = self.state_mut();
        if let Some(port) = state.inputs.get_mut(input) {
            if let Some(next) = port.queued.pop_front() {
                port.current = if next.is_null() { None } else { Some(next) };
                port.pending = true;
            }
        }
    }

    /// Run the handlers of `input`, or the any-input handlers. A failing handler is
    /// removed and the remaining handlers of the same input are skipped.
    fn invoke_handlers(&self, input: Option<&str>, first_error: &mut Option<EngineError>) {
        let handlers = self.state().handlers.snapshot(input);
        for (handle, handler) in handlers {
            if !self.state().handlers.contains(handle) {
                continue;
            }
            if let Err(source) = handler(self) {
                self.state_mut().handlers.remove(handle);
                InputHandlerFailed {
                    accessor: self.name(),
                    input,
                    error: &source,
                }
                .log();
                first_error.get_or_insert(EngineError::Handler {
                    accessor: self.name().to_string(),
                    input: input.map(str::to_string),
                    source,
                });
                break;
            }
        }
    }

    /// Register a handler for `input`, or for any input when `None`.
    pub fn add_input_handler<F>(&self, input: Option<&str>, handler: F) -> EngineResult<HandlerHandle>
    where
        F: Fn(&Accessor) -> anyhow::Result<()> + 'static,
    {
        self.register_handler(input, Rc::new(handler))
    }

    /// Register a handler invoked with extra bound arguments.
    pub fn add_input_handler_with_args<F>(
        &self,
        input: Option<&str>,
        handler: F,
        args: Vec<Value>,
    ) -> EngineResult<HandlerHandle>
    where
        F: Fn(&Accessor, &[Value]) -> anyhow::Result<()> + 'static,
    {
        let bound = BoundHandler::new(handler, args);
        self.register_handler(input, Rc::new(move |this: &Accessor| bound.invoke(this)))
    }

    fn register_handler(&self, input: Option<&str>, handler: HandlerFn) -> EngineResult<HandlerHandle> {
        if let Some(name) = input {
            if !self.has_port(PortKind::Input, name) {
                return Err(self.unknown(PortKind::Input, name));
            }
        }
        Ok(self.state_mut().handlers.add(input, handler))
    }

    /// Returns whether the handler was still registered.
    pub fn remove_input_handler(&self, handle: HandlerHandle) -> bool {
        self.state_mut().handlers.remove(handle)
    }

    pub fn handler_count(&self) -> usize {
        self.state().handlers.len()
    }

    /// Listen for lifecycle notifications of this accessor.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&AccessorEvent) + 'static,
    {
        let listener: Listener = Rc::new(listener);
        self.state_mut().listeners.add(kind, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.state_mut().listeners.remove(id)
    }

    pub(crate) fn emit(&self, event: AccessorEvent) {
        let listeners = self.state().listeners.snapshot(event.kind());
        for listener in listeners {
            listener(&event);
        }
    }

    /// Run `callback` once after `delay`. The timer is cancelled by `wrapup`.
    pub fn set_timeout<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce(&Accessor) -> anyhow::Result<()> + 'static,
    {
        let name = self.name().to_string();
        self.schedule_internal(delay, move |this| {
            callback(this).map_err(|source| EngineError::Timer {
                accessor: name,
                source,
            })
        })
    }

    /// Run `callback` every `period` until cleared or wrapped up.
    pub fn set_interval<F>(&self, period: Duration, mut callback: F) -> TimerHandle
    where
        F: FnMut(&Accessor) -> anyhow::Result<()> + 'static,
    {
        let weak = self.downgrade();
        let handle = self.host().timers().schedule_repeating(
            Box::new(move || {
                let Some(this) = weak.upgrade() else {
                    return;
                };
                if let Err(source) = callback(&this) {
                    this.host().report(EngineError::Timer {
                        accessor: this.name().to_string(),
                        source,
                    });
                }
            }),
            period,
        );
        self.state_mut().timers.push(handle);
        handle
    }

    /// Cancel a timer created by `set_timeout` or `set_interval`.
    pub fn clear_timer(&self, handle: TimerHandle) {
        self.state_mut().timers.retain(|h| *h != handle);
        self.host().timers().cancel(handle);
    }

    /// Timers currently tracked for this accessor.
    pub fn pending_timers(&self) -> usize {
        self.state().timers.len()
    }

    /// One-shot timer whose failure goes to the host error sink.
    fn schedule_internal<F>(&self, delay: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce(&Accessor) -> EngineResult<()> + 'static,
    {
        let weak = self.downgrade();
        let slot: Rc<Cell<Option<TimerHandle>>> = Rc::new(Cell::new(None));
        let own_handle = slot.clone();
        let handle = self.host().timers().schedule(
            Box::new(move || {
                let Some(this) = weak.upgrade() else {
                    return;
                };
                if let Some(handle) = own_handle.get() {
                    this.state_mut().timers.retain(|h| *h != handle);
                }
                if let Err(error) = callback(&this) {
                    this.host().report(error);
                }
            }),
            delay,
        );
        slot.set(Some(handle));
        self.state_mut().timers.push(handle);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{Connection, PortOptions, PortType};
    use crate::backends::local::LibrarySourceProvider;
    use crate::backends::timers::ManualTimers;
    use crate::engine::Runtime;
    use crate::traits::SetupFn;
    use serde_json::json;
    use std::cell::RefCell;

    fn runtime() -> (Runtime, Rc<ManualTimers>) {
        let timers = Rc::new(ManualTimers::new());
        let runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), timers.clone());
        (runtime, timers)
    }

    fn two_inputs(runtime: &mut Runtime) -> Accessor {
        runtime
            .instantiate_definition(
                "a",
                Rc::new(SetupFn::new(|this: &Accessor| {
                    this.input("x", PortOptions::typed(PortType::Number).with_value(json!(1)))?;
                    this.input("y", PortOptions::default())?;
                    this.output("out", PortOptions::default())?;
                    Ok(())
                })),
            )
            .unwrap()
    }

    #[test]
    fn test_input_isolation_across_reactions() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        a.initialize().unwrap();

        assert_eq!(a.get("x").unwrap(), json!(1));
        a.provide_input("x", json!(5)).unwrap();
        assert_eq!(a.get("x").unwrap(), json!(5));
        a.react(None).unwrap();
        assert_eq!(a.get("x").unwrap(), json!(1));
    }

    #[test]
    fn test_null_without_default_triggers_nothing() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        a.add_input_handler(Some("y"), move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();

        a.provide_input("y", Value::Null).unwrap();
        a.react(None).unwrap();
        assert_eq!(calls.get(), 0);

        a.provide_input("y", json!("v")).unwrap();
        a.react(None).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_queued_values_are_handled_in_order_within_one_reaction() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        a.add_input_handler(Some("x"), move |this| {
            sink.borrow_mut().push(this.get("x")?);
            Ok(())
        })
        .unwrap();

        a.provide_input("x", json!(2)).unwrap();
        a.provide_input("x", json!(3)).unwrap();
        a.react(None).unwrap();

        assert_eq!(*seen.borrow(), vec![json!(2), json!(3)]);
    }

    #[test]
    fn test_null_while_pending_keeps_the_pending_value() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        a.add_input_handler(Some("y"), move |this| {
            sink.borrow_mut().push(this.get("y")?);
            Ok(())
        })
        .unwrap();

        a.provide_input("y", json!(5)).unwrap();
        a.provide_input("y", Value::Null).unwrap();
        assert_eq!(a.get("y").unwrap(), json!(5));
        a.react(None).unwrap();
        assert_eq!(*seen.borrow(), vec![json!(5)]);

        a.provide_input("y", json!(6)).unwrap();
        a.provide_input("y", Value::Null).unwrap();
        a.provide_input("y", json!(7)).unwrap();
        a.react(None).unwrap();
        assert_eq!(*seen.borrow(), vec![json!(5), json!(6), json!(7)]);
    }

    fn fan_out(runtime: &mut Runtime) -> Accessor {
        runtime
            .instantiate_definition(
                "c",
                Rc::new(SetupFn::new(|this: &Accessor| {
                    this.input("in", PortOptions::default())?;
                    this.output("out", PortOptions::default())?;
                    let bad = this.instantiate("bad", "identity")?;
                    let good = this.instantiate("good", "identity")?;
                    this.connect(Connection::input_to_contained("in", &bad, "input"))?;
                    this.connect(Connection::input_to_contained("in", &good, "input"))?;
                    this.connect(Connection::contained_to_output(&good, "output", "out"))?;
                    Ok(())
                })),
            )
            .unwrap()
    }

    #[test]
    fn test_failing_child_does_not_strand_its_siblings() {
        let (mut runtime, timers) = runtime();
        let c = fan_out(&mut runtime);
        c.initialize().unwrap();
        let bad = c.contained("bad").unwrap();
        let good = c.contained("good").unwrap();
        bad.add_input_handler(Some("input"), |_| Err(anyhow::anyhow!("boom")))
            .unwrap();

        c.provide_input("in", json!(7)).unwrap();
        timers.run_until_idle();

        let errors = runtime.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].accessor(), Some("c.bad"));
        assert_eq!(c.latest_output("out").unwrap(), json!(7));
        assert!(!c.is_scheduled(&good));
    }

    #[test]
    fn test_failing_own_handler_reacts_again_for_queued_children() {
        let (mut runtime, timers) = runtime();
        let c = fan_out(&mut runtime);
        c.initialize().unwrap();
        let good = c.contained("good").unwrap();
        c.add_input_handler(Some("in"), |_| Err(anyhow::anyhow!("boom")))
            .unwrap();

        c.provide_input("in", json!(7)).unwrap();
        assert!(matches!(c.react(None), Err(EngineError::Handler { .. })));
        assert!(c.is_scheduled(&good));

        timers.run_until_idle();
        assert!(runtime.take_errors().is_empty());
        assert!(!c.is_scheduled(&good));
        assert_eq!(c.latest_output("out").unwrap(), json!(7));
    }

    #[test]
    fn test_react_with_name_only_handles_that_input() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for input in ["x", "y"] {
            let sink = seen.clone();
            a.add_input_handler(Some(input), move |_| {
                sink.borrow_mut().push(input);
                Ok(())
            })
            .unwrap();
        }

        a.provide_input("x", json!(2)).unwrap();
        a.provide_input("y", json!(3)).unwrap();
        a.react(Some("y")).unwrap();
        assert_eq!(*seen.borrow(), vec!["y"]);
        assert_eq!(a.get("x").unwrap(), json!(2));

        a.react(None).unwrap();
        assert_eq!(*seen.borrow(), vec!["y", "x"]);
    }

    #[test]
    fn test_failing_handler_is_removed_and_others_continue() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));

        a.add_input_handler(Some("x"), |_| Err(anyhow::anyhow!("boom")))
            .unwrap();
        let sink = seen.clone();
        a.add_input_handler(Some("x"), move |_| {
            sink.borrow_mut().push("x2");
            Ok(())
        })
        .unwrap();
        let sink = seen.clone();
        a.add_input_handler(Some("y"), move |_| {
            sink.borrow_mut().push("y");
            Ok(())
        })
        .unwrap();

        a.provide_input("x", json!(1)).unwrap();
        a.provide_input("y", json!(1)).unwrap();
        match a.react(None) {
            Err(EngineError::Handler { accessor, input, .. }) => {
                assert_eq!(accessor, "a");
                assert_eq!(input.as_deref(), Some("x"));
            }
            other => panic!("expected handler error, got {:?}", other),
        }
        assert_eq!(*seen.borrow(), vec!["y"]);
        assert_eq!(a.handler_count(), 2);

        a.provide_input("x", json!(2)).unwrap();
        a.react(None).unwrap();
        assert_eq!(*seen.borrow(), vec!["y", "x2"]);
    }

    #[test]
    fn test_bound_handler_receives_args() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        a.add_input_handler_with_args(
            Some("x"),
            |this, args| {
                this.send("out", args[0].clone())?;
                Ok(())
            },
            vec![json!("bound")],
        )
        .unwrap();

        a.provide_input("x", json!(1)).unwrap();
        a.react(None).unwrap();
        assert_eq!(a.latest_output("out").unwrap(), json!("bound"));
    }

    #[test]
    fn test_handler_on_unknown_input_is_rejected() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        assert!(matches!(
            a.add_input_handler(Some("nope"), |_| Ok(())),
            Err(EngineError::UnknownPort { .. })
        ));
    }

    #[test]
    fn test_send_to_own_input_arrives_next_reaction() {
        let (mut runtime, timers) = runtime();
        let a = two_inputs(&mut runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        a.add_input_handler(Some("y"), move |this| {
            sink.borrow_mut().push(this.get("y")?);
            Ok(())
        })
        .unwrap();

        a.send("y", json!("later")).unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(a.get("y").unwrap(), Value::Null);

        timers.run_until_idle();
        assert_eq!(*seen.borrow(), vec![json!("later")]);
    }

    #[test]
    fn test_self_send_stalls_without_timer_loop() {
        let (mut runtime, timers) = runtime();
        let a = two_inputs(&mut runtime);
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        a.add_input_handler(Some("y"), move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();

        a.send("y", json!(1)).unwrap();
        a.send("y", json!(2)).unwrap();
        assert_eq!(calls.get(), 0);
        assert_eq!(timers.pending(), 3);
    }

    #[test]
    fn test_send_to_unknown_port() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        assert!(matches!(
            a.send("nope", json!(1)),
            Err(EngineError::UnknownPort { kind: PortKind::Output, .. })
        ));
    }

    #[test]
    fn test_lifecycle_events_in_order() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::InitializeStart,
            EventKind::InitializeEnd,
            EventKind::ReactStart,
            EventKind::ReactEnd,
            EventKind::Output,
            EventKind::WrapupStart,
            EventKind::WrapupEnd,
        ] {
            let sink = seen.clone();
            a.on(kind, move |event| sink.borrow_mut().push(event.kind()));
        }

        a.initialize().unwrap();
        a.send("out", json!(1)).unwrap();
        a.react(None).unwrap();
        a.wrapup().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                EventKind::InitializeStart,
                EventKind::InitializeEnd,
                EventKind::Output,
                EventKind::ReactStart,
                EventKind::ReactEnd,
                EventKind::WrapupStart,
                EventKind::WrapupEnd,
            ]
        );
    }

    #[test]
    fn test_wrapup_cancels_timers_and_handlers() {
        let (mut runtime, timers) = runtime();
        let a = two_inputs(&mut runtime);
        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();
        a.set_interval(Duration::from_millis(10), move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        a.add_input_handler(None, |_| Ok(())).unwrap();

        timers.advance(Duration::from_millis(25));
        assert_eq!(ticks.get(), 2);

        a.wrapup().unwrap();
        assert_eq!(a.pending_timers(), 0);
        assert_eq!(a.handler_count(), 0);

        timers.advance(Duration::from_millis(50));
        assert_eq!(ticks.get(), 2);
    }

    #[test]
    fn test_wrapup_without_initialize() {
        let (mut runtime, _) = runtime();
        let a = two_inputs(&mut runtime);
        assert!(a.wrapup().is_ok());
        assert!(!a.is_initialized());
    }

    #[test]
    fn test_timer_errors_go_to_host_sink() {
        let (mut runtime, timers) = runtime();
        let a = two_inputs(&mut runtime);
        a.set_timeout(Duration::from_millis(5), |_| Err(anyhow::anyhow!("late failure")));

        timers.run_until_idle();
        let errors = runtime.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], EngineError::Timer { accessor, .. } if accessor == "a"));
        assert_eq!(a.pending_timers(), 0);
    }

    #[test]
    fn test_clear_timer() {
        let (mut runtime, timers) = runtime();
        let a = two_inputs(&mut runtime);
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let handle = a.set_timeout(Duration::from_millis(5), move |_| {
            flag.set(true);
            Ok(())
        });
        a.clear_timer(handle);
        a.clear_timer(handle);

        timers.run_until_idle();
        assert!(!fired.get());
    }
}
