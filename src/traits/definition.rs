// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::accessor::Accessor;
use crate::errors::Hook;

/// Behaviour of an accessor class.
///
/// A definition is stateless with respect to any one instance: everything an instance
/// owns (ports, handlers, timers, contained accessors) lives on the [`Accessor`] passed
/// to every hook. The same definition value can therefore back many instances.
///
/// `setup` declares the interface with [`Accessor::input`], [`Accessor::output`],
/// [`Accessor::parameter`] and may stack other classes with [`Accessor::extend`] and
/// [`Accessor::implement`]. The remaining hooks default to calling the same hook of the
/// base layer this definition extends, so a subclass that does not override `fire`
/// inherits its base's `fire`. An override reaches its base explicitly through
/// [`Accessor::invoke_base`].
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use swarmlet::accessor::{Accessor, PortOptions, PortType};
/// use swarmlet::traits::AccessorDefinition;
///
/// struct Doubler;
///
/// impl AccessorDefinition for Doubler {
///     fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
///         this.input("input", PortOptions::typed(PortType::Number))?;
///         this.output("output", PortOptions::typed(PortType::Number))?;
///         Ok(())
///     }
///
///     fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
///         this.add_input_handler(Some("input"), |this: &Accessor| {
///             let value = this.get("input")?.as_f64().unwrap_or(0.0);
///             this.send("output", json!(value * 2.0))?;
///             Ok(())
///         })?;
///         Ok(())
///     }
/// }
/// ```
pub trait AccessorDefinition {
    /// Declare ports and stack base layers.
    fn setup(&self, _this: &Accessor) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after the container assigned priorities and initialized the children.
    fn initialize(&self, this: &Accessor) -> anyhow::Result<()> {
        this.invoke_base(self, Hook::Initialize)
    }

    /// Called at the end of every reaction, after input handlers and contained reactions.
    fn fire(&self, this: &Accessor) -> anyhow::Result<()> {
        this.invoke_base(self, Hook::Fire)
    }

    /// Called when the accessor is wrapped up, after handlers and timers were released.
    fn wrapup(&self, this: &Accessor) -> anyhow::Result<()> {
        this.invoke_base(self, Hook::Wrapup)
    }
}

/// Wraps a plain function as a definition that only has a `setup` hook.
///
/// Handy for composites assembled entirely in `setup` (instantiate, connect) and for tests.
pub struct SetupFn<F>(F);

impl<F> SetupFn<F>
where
    F: Fn(&Accessor) -> anyhow::Result<()>,
{
    pub fn new(setup: F) -> Self {
        Self(setup)
    }
}

impl<F> AccessorDefinition for SetupFn<F>
where
    F: Fn(&Accessor) -> anyhow::Result<()>,
{
    fn setup(&self, this: &Accessor) -> anyhow::Result<()> {
        (self.0)(this)
    }
}
