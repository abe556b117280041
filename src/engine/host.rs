// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Process-scoped host state and the top-level accessor registry.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::accessor::{Accessor, WeakAccessor};
use crate::errors::{EngineError, EngineResult};
use crate::observability::messages::accessor::HostErrorReported;
use crate::observability::messages::StructuredLog;
use crate::traits::{AccessorDefinition, SourceProvider, Timers};

/// Collaborators and shared state for every accessor of one swarmlet host.
///
/// The host owns the [`SourceProvider`] and [`Timers`] implementations, an error sink for
/// failures that happen inside timer callbacks (where no caller is left to return them
/// to), and a weak registry of top-level accessors.
pub struct Host {
    source: Rc<dyn SourceProvider>,
    timers: Rc<dyn Timers>,
    trusted: Cell<bool>,
    errors: RefCell<Vec<EngineError>>,
    registry: RefCell<Vec<WeakAccessor>>,
}

impl Host {
    pub fn new(source: Rc<dyn SourceProvider>, timers: Rc<dyn Timers>) -> Rc<Self> {
        Rc::new(Self {
            source,
            timers,
            trusted: Cell::new(false),
            errors: RefCell::new(Vec::new()),
            registry: RefCell::new(Vec::new()),
        })
    }

    pub fn source(&self) -> &Rc<dyn SourceProvider> {
        &self.source
    }

    pub fn timers(&self) -> &Rc<dyn Timers> {
        &self.timers
    }

    /// Whether accessors may enumerate the top-level registry.
    pub fn is_trusted(&self) -> bool {
        self.trusted.get()
    }

    pub fn set_trusted(&self, trusted: bool) {
        self.trusted.set(trusted);
    }

    /// Record an error raised where it cannot be returned to a caller.
    pub fn report(&self, error: EngineError) {
        HostErrorReported {
            accessor: error.accessor().unwrap_or("<host>"),
            error: &error,
        }
        .log();
        self.errors.borrow_mut().push(error);
    }

    /// Drain the error sink.
    pub fn take_errors(&self) -> Vec<EngineError> {
        std::mem::take(&mut *self.errors.borrow_mut())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.borrow().is_empty()
    }

    pub(crate) fn register(&self, accessor: &Accessor) {
        let mut registry = self.registry.borrow_mut();
        registry.retain(|entry| entry.upgrade().is_some());
        registry.push(accessor.downgrade());
    }

    pub(crate) fn unregister(&self, accessor: &Accessor) {
        self.registry
            .borrow_mut()
            .retain(|entry| entry.upgrade().is_some() && !entry.points_to(accessor));
    }

    /// Live top-level accessors, in registration order.
    pub(crate) fn top_level(&self) -> Vec<Accessor> {
        self.registry
            .borrow()
            .iter()
            .filter_map(WeakAccessor::upgrade)
            .collect()
    }
}

/// Owner of the top-level accessors of a swarmlet.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use swarmlet::backends::local::LibrarySourceProvider;
/// use swarmlet::backends::timers::ManualTimers;
/// use swarmlet::engine::Runtime;
///
/// let mut runtime = Runtime::new(
///     Rc::new(LibrarySourceProvider::new()),
///     Rc::new(ManualTimers::new()),
/// );
/// let scale = runtime.instantiate("scale", "math/Scale").unwrap();
/// assert_eq!(scale.name(), "scale");
/// assert!(runtime.get("scale").is_some());
/// ```
pub struct Runtime {
    host: Rc<Host>,
    accessors: Vec<Accessor>,
}

impl Runtime {
    pub fn new(source: Rc<dyn SourceProvider>, timers: Rc<dyn Timers>) -> Self {
        Self {
            host: Host::new(source, timers),
            accessors: Vec::new(),
        }
    }

    /// Grant or revoke the capability to enumerate top-level accessors.
    pub fn with_trust(self, trusted: bool) -> Self {
        self.host.set_trusted(trusted);
        self
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.host
    }

    /// Create a top-level accessor from a class known to the source provider.
    pub fn instantiate(&mut self, name: &str, class: &str) -> EngineResult<Accessor> {
        let definition = self.host.source().get_code(class)?;
        self.create(name, class, definition)
    }

    /// Create a top-level accessor from an inline definition.
    pub fn instantiate_definition(
        &mut self,
        name: &str,
        definition: Rc<dyn AccessorDefinition>,
    ) -> EngineResult<Accessor> {
        self.create(name, crate::accessor::CUSTOM_CLASS, definition)
    }

    fn create(
        &mut self,
        name: &str,
        class: &str,
        definition: Rc<dyn AccessorDefinition>,
    ) -> EngineResult<Accessor> {
        if self.get(name).is_some() {
            return Err(EngineError::DuplicateName {
                container: "runtime".to_string(),
                name: name.to_string(),
            });
        }
        let accessor = Accessor::create(
            name.to_string(),
            class.to_string(),
            definition,
            self.host.clone(),
            None,
        )?;
        self.host.register(&accessor);
        self.accessors.push(accessor.clone());
        Ok(accessor)
    }

    pub fn get(&self, name: &str) -> Option<Accessor> {
        self.accessors.iter().find(|a| a.name() == name).cloned()
    }

    /// Drop a top-level accessor from the registry. The caller decides whether to wrap it up.
    pub fn remove(&mut self, name: &str) -> Option<Accessor> {
        let index = self.accessors.iter().position(|a| a.name() == name)?;
        let accessor = self.accessors.remove(index);
        self.host.unregister(&accessor);
        Some(accessor)
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    pub fn take_errors(&self) -> Vec<EngineError> {
        self.host.take_errors()
    }

    /// Wrap up every top-level accessor, returning the first failure.
    pub fn wrapup_all(&self) -> EngineResult<()> {
        let mut first_error = None;
        for accessor in &self.accessors {
            if let Err(error) = accessor.wrapup() {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::local::LibrarySourceProvider;
    use crate::backends::timers::ManualTimers;

    fn runtime() -> Runtime {
        Runtime::new(
            Rc::new(LibrarySourceProvider::new()),
            Rc::new(ManualTimers::new()),
        )
    }

    #[test]
    fn test_duplicate_top_level_name() {
        let mut runtime = runtime();
        runtime.instantiate("a", "identity").unwrap();
        let error = runtime.instantiate("a", "identity").unwrap_err();
        assert!(matches!(error, EngineError::DuplicateName { .. }));
    }

    #[test]
    fn test_unknown_class() {
        let mut runtime = runtime();
        let error = runtime.instantiate("a", "no/Such").unwrap_err();
        assert!(matches!(error, EngineError::NotFound { class } if class == "no/Such"));
    }

    #[test]
    fn test_registry_requires_trust() {
        let mut runtime = runtime();
        let a = runtime.instantiate("a", "identity").unwrap();
        runtime.instantiate("b", "identity").unwrap();

        assert!(matches!(
            a.top_level_accessors(),
            Err(EngineError::NotTrusted { .. })
        ));

        let runtime = runtime.with_trust(true);
        let names: Vec<_> = a
            .top_level_accessors()
            .unwrap()
            .iter()
            .map(|x| x.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        drop(runtime);
    }

    #[test]
    fn test_remove_unregisters() {
        let mut runtime = runtime().with_trust(true);
        let a = runtime.instantiate("a", "identity").unwrap();
        runtime.instantiate("b", "identity").unwrap();

        let removed = runtime.remove("b").unwrap();
        assert_eq!(removed.name(), "b");
        assert_eq!(a.top_level_accessors().unwrap().len(), 1);
        assert!(runtime.remove("b").is_none());
    }

    #[test]
    fn test_report_and_take_errors() {
        let runtime = runtime();
        runtime.host().report(EngineError::NotFound {
            class: "x".to_string(),
        });
        assert!(runtime.host().has_errors());
        assert_eq!(runtime.take_errors().len(), 1);
        assert!(runtime.take_errors().is_empty());
    }
}
