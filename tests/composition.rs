// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end behaviour of composites built through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use swarmlet::accessor::{
    Accessor, AccessorEvent, Connection, EventKind, PortOptions, PortType, ReifyTarget,
};
use swarmlet::backends::local::{Add, LibrarySourceProvider, Offset, Ramp, Scale};
use swarmlet::backends::timers::ManualTimers;
use swarmlet::engine::Runtime;
use swarmlet::errors::EngineError;
use swarmlet::traits::{AccessorDefinition, SetupFn};

fn runtime() -> (Runtime, Rc<ManualTimers>) {
    let timers = Rc::new(ManualTimers::new());
    let runtime = Runtime::new(Rc::new(LibrarySourceProvider::new()), timers.clone());
    (runtime, timers)
}

fn linear_composite(runtime: &mut Runtime) -> Accessor {
    runtime
        .instantiate_definition(
            "c",
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.input("input", PortOptions::typed(PortType::Number))?;
                this.output("output", PortOptions::typed(PortType::Number))?;

                let a = this.instantiate("a", Scale::CLASS)?;
                a.set_parameter("factor", json!(2))?;
                let b = this.instantiate("b", Offset::CLASS)?;
                b.set_parameter("offset", json!(5))?;

                this.connect(Connection::input_to_contained("input", &a, "input"))?;
                this.connect(Connection::peer(&a, "output", &b, "input"))?;
                this.connect(Connection::contained_to_output(&b, "output", "output"))?;
                Ok(())
            })),
        )
        .unwrap()
}

#[test]
fn linear_composite_reacts_synchronously() {
    let (mut runtime, _timers) = runtime();
    let c = linear_composite(&mut runtime);
    c.initialize().unwrap();

    let a = c.contained("a").unwrap();
    let b = c.contained("b").unwrap();
    assert!(a.priority().unwrap() < b.priority().unwrap());

    c.provide_input("input", json!(10)).unwrap();
    c.react(None).unwrap();
    assert_eq!(c.latest_output("output").unwrap(), json!(25));
}

#[test]
fn linear_composite_reacts_through_timer_loop() {
    let (mut runtime, timers) = runtime();
    let c = linear_composite(&mut runtime);
    c.initialize().unwrap();

    let outputs = Rc::new(RefCell::new(Vec::new()));
    let sink = outputs.clone();
    c.on(EventKind::Output, move |event| {
        if let AccessorEvent::Output { value, .. } = event {
            sink.borrow_mut().push(value.clone());
        }
    });

    for input in [10, 0, -5] {
        c.provide_input("input", json!(input)).unwrap();
        timers.run_until_idle();
    }
    assert_eq!(*outputs.borrow(), vec![json!(25), json!(5), json!(-5)]);
    assert!(runtime.take_errors().is_empty());
}

#[test]
fn two_inputs_of_one_child_share_a_reaction() {
    let (mut runtime, timers) = runtime();
    let c = runtime
        .instantiate_definition(
            "c",
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.input("x", PortOptions::default())?;
                this.input("y", PortOptions::default())?;
                this.output("sum", PortOptions::default())?;
                let add = this.instantiate("add", Add::CLASS)?;
                this.connect(Connection::input_to_contained("x", &add, "a"))?;
                this.connect(Connection::input_to_contained("y", &add, "b"))?;
                this.connect(Connection::contained_to_output(&add, "sum", "sum"))?;
                Ok(())
            })),
        )
        .unwrap();
    c.initialize().unwrap();

    let add = c.contained("add").unwrap();
    let reactions = Rc::new(Cell::new(0));
    let counter = reactions.clone();
    add.on(EventKind::ReactStart, move |_| counter.set(counter.get() + 1));

    c.provide_input("x", json!(1)).unwrap();
    c.provide_input("y", json!(2)).unwrap();
    assert!(c.is_scheduled(&add));

    timers.run_until_idle();
    assert_eq!(reactions.get(), 1);
    assert_eq!(c.latest_output("sum").unwrap(), json!(3));
}

/// `top` contains `mid`, which doubles its input with a contained scale.
fn composite_in_composite(runtime: &mut Runtime) -> Accessor {
    runtime
        .instantiate_definition(
            "top",
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.input("in", PortOptions::default())?;
                this.output("out", PortOptions::default())?;
                let mid = this.instantiate_definition(
                    "mid",
                    Rc::new(SetupFn::new(|this: &Accessor| {
                        this.input("in", PortOptions::default())?;
                        this.output("out", PortOptions::default())?;
                        let double = this.instantiate("double", Scale::CLASS)?;
                        double.set_parameter("factor", json!(2))?;
                        this.connect(Connection::input_to_contained("in", &double, "input"))?;
                        this.connect(Connection::contained_to_output(&double, "output", "out"))?;
                        Ok(())
                    })),
                )?;
                this.connect(Connection::input_to_contained("in", &mid, "in"))?;
                this.connect(Connection::contained_to_output(&mid, "out", "out"))?;
                Ok(())
            })),
        )
        .unwrap()
}

#[test]
fn nested_composite_passes_input_through() {
    let (mut runtime, timers) = runtime();
    let top = composite_in_composite(&mut runtime);
    top.initialize().unwrap();
    let mid = top.contained("mid").unwrap();

    top.provide_input("in", json!(3)).unwrap();
    assert!(top.is_scheduled(&mid));
    timers.run_until_idle();
    assert_eq!(top.latest_output("out").unwrap(), json!(6));

    top.provide_input("in", json!(-4)).unwrap();
    timers.run_until_idle();
    assert_eq!(top.latest_output("out").unwrap(), json!(-8));
    assert!(runtime.take_errors().is_empty());
}

#[test]
fn deeply_nested_timer_send_reaches_top_level_output() {
    let (mut runtime, timers) = runtime();
    let top = runtime
        .instantiate_definition(
            "top",
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.output("out", PortOptions::default())?;
                let mid = this.instantiate_definition(
                    "mid",
                    Rc::new(SetupFn::new(|this: &Accessor| {
                        this.output("out", PortOptions::default())?;
                        let leaf = this.instantiate_definition(
                            "leaf",
                            Rc::new(SetupFn::new(|this: &Accessor| {
                                this.output("out", PortOptions::default())?;
                                let ramp = this.instantiate("ramp", Ramp::CLASS)?;
                                ramp.set_parameter("start", json!(1))?;
                                ramp.set_parameter("interval_ms", json!(100))?;
                                let tenfold = this.instantiate("tenfold", Scale::CLASS)?;
                                tenfold.set_parameter("factor", json!(10))?;
                                this.connect(Connection::peer(&ramp, "output", &tenfold, "input"))?;
                                this.connect(Connection::contained_to_output(
                                    &tenfold, "output", "out",
                                ))?;
                                Ok(())
                            })),
                        )?;
                        this.connect(Connection::contained_to_output(&leaf, "out", "out"))?;
                        Ok(())
                    })),
                )?;
                this.connect(Connection::contained_to_output(&mid, "out", "out"))?;
                Ok(())
            })),
        )
        .unwrap();
    top.initialize().unwrap();

    let outputs = Rc::new(RefCell::new(Vec::new()));
    let sink = outputs.clone();
    top.on(EventKind::Output, move |event| {
        if let AccessorEvent::Output { value, .. } = event {
            sink.borrow_mut().push(value.clone());
        }
    });

    timers.advance(Duration::from_millis(250));
    assert_eq!(*outputs.borrow(), vec![json!(10), json!(20)]);
    assert_eq!(top.latest_output("out").unwrap(), json!(20));
    assert!(runtime.take_errors().is_empty());
}

struct PlusOne;

impl AccessorDefinition for PlusOne {
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.input("x", PortOptions::default())?;
        this.output("y", PortOptions::typed(PortType::Number))?;
        Ok(())
    }

    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        this.add_input_handler(Some("x"), |this: &Accessor| {
            let x = this.get("x")?.as_i64().unwrap_or_default();
            this.send("y", json!(x + 1))?;
            Ok(())
        })?;
        Ok(())
    }
}

fn mutable(runtime: &mut Runtime) -> Accessor {
    runtime
        .instantiate_definition(
            "m",
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.declare_mutable();
                this.input("x", PortOptions::default())?;
                this.output("y", PortOptions::typed(PortType::Number))?;
                Ok(())
            })),
        )
        .unwrap()
}

#[test]
fn mutable_forwards_to_its_reification() {
    let (mut runtime, timers) = runtime();
    let m = mutable(&mut runtime);
    m.initialize().unwrap();

    assert!(m.reify(ReifyTarget::Definition(Rc::new(PlusOne))).unwrap());
    m.provide_input("x", json!(4)).unwrap();
    timers.run_until_idle();
    assert_eq!(m.latest_output("y").unwrap(), json!(5));
}

#[test]
fn mismatched_reification_leaves_mutable_untouched() {
    let (mut runtime, _timers) = runtime();
    let m = mutable(&mut runtime);
    m.initialize().unwrap();
    let before = m.contained_accessors().len();

    let wordy = Rc::new(SetupFn::new(|this: &Accessor| {
        this.input("x", PortOptions::default())?;
        this.output("y", PortOptions::typed(PortType::String))?;
        Ok(())
    }));
    assert!(!m.reify(ReifyTarget::Definition(wordy)).unwrap());
    assert!(!m.is_reified());
    assert_eq!(m.contained_accessors().len(), before);
}

#[test]
fn failing_handler_is_isolated() {
    let (mut runtime, _timers) = runtime();
    let a = runtime
        .instantiate_definition(
            "a",
            Rc::new(SetupFn::new(|this: &Accessor| {
                this.input("trigger", PortOptions::default())?;
                Ok(())
            })),
        )
        .unwrap();
    a.initialize().unwrap();

    let fired = Rc::new(Cell::new(0));
    let failing = a
        .add_input_handler(Some("trigger"), |_: &Accessor| -> anyhow::Result<()> {
            anyhow::bail!("boom")
        })
        .unwrap();
    let counter = fired.clone();
    a.add_input_handler(Some("trigger"), move |_: &Accessor| {
        counter.set(counter.get() + 1);
        Ok(())
    })
    .unwrap();

    a.provide_input("trigger", json!(true)).unwrap();
    let error = a.react(None).unwrap_err();
    assert!(matches!(error, EngineError::Handler { .. }));
    assert!(format!("{:#}", anyhow::Error::new(error)).contains("boom"));
    assert!(!a.remove_input_handler(failing));

    a.provide_input("trigger", json!(true)).unwrap();
    a.react(None).unwrap();
    assert_eq!(fired.get(), 1);
}

#[test]
fn feedback_loop_is_rejected_unless_spontaneous() {
    let (mut runtime, _timers) = runtime();
    let looped = runtime
        .instantiate_definition(
            "looped",
            Rc::new(SetupFn::new(|this: &Accessor| {
                let a = this.instantiate("a", "identity")?;
                let b = this.instantiate("b", "identity")?;
                this.connect(Connection::peer(&a, "output", &b, "input"))?;
                this.connect(Connection::peer(&b, "output", &a, "input"))?;
                Ok(())
            })),
        )
        .unwrap();
    assert!(matches!(
        looped.initialize(),
        Err(EngineError::CausalityLoop { .. })
    ));

    let broken = runtime
        .instantiate_definition(
            "broken",
            Rc::new(SetupFn::new(|this: &Accessor| {
                let ticker = this.instantiate_definition(
                    "ticker",
                    Rc::new(SetupFn::new(|this: &Accessor| {
                        this.input("reset", PortOptions::default())?;
                        this.output("tick", PortOptions::default().spontaneous())?;
                        Ok(())
                    })),
                )?;
                let add = this.instantiate("add", Add::CLASS)?;
                this.connect(Connection::peer(&ticker, "tick", &add, "a"))?;
                this.connect(Connection::peer(&add, "sum", &ticker, "reset"))?;
                Ok(())
            })),
        )
        .unwrap();
    broken.initialize().unwrap();

    let ticker = broken.contained("ticker").unwrap();
    let add = broken.contained("add").unwrap();
    assert!(add.priority().unwrap() < ticker.priority().unwrap());
}
