// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::errors::{EngineError, EngineResult};
use crate::traits::{AccessorDefinition, SourceProvider};

use super::accessors::*;

/// Source provider serving the built-in accessor library, plus any definition registered
/// by the embedder.
///
/// Class names served out of the box:
/// - "identity" -> [`Identity`]
/// - "interfaces/Transform" -> [`Transform`]
/// - "math/Scale" -> [`Scale`]
/// - "math/Offset" -> [`Offset`]
/// - "math/Affine" -> [`Affine`] (extends "math/Scale")
/// - "math/Add" -> [`Add`]
/// - "timers/Ramp" -> [`Ramp`]
/// - "util/Collect" -> [`Collect`]
/// - "util/Logger" -> [`Logger`]
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use swarmlet::accessor::{Accessor, PortOptions};
/// use swarmlet::backends::local::LibrarySourceProvider;
/// use swarmlet::traits::{SetupFn, SourceProvider};
///
/// let provider = LibrarySourceProvider::new().with_definition(
///     "acme/Probe",
///     Rc::new(SetupFn::new(|this: &Accessor| {
///         this.input("input", PortOptions::default())?;
///         Ok(())
///     })),
/// );
/// assert!(provider.contains("acme/Probe"));
/// assert!(provider.contains("math/Scale"));
/// assert!(!provider.contains("acme/Missing"));
/// ```
pub struct LibrarySourceProvider {
    definitions: BTreeMap<String, Rc<dyn AccessorDefinition>>,
}

impl LibrarySourceProvider {
    pub fn new() -> Self {
        let mut provider = Self::empty();
        provider.register(Identity::CLASS, Rc::new(Identity));
        provider.register(Transform::CLASS, Rc::new(Transform));
        provider.register(Scale::CLASS, Rc::new(Scale));
        provider.register(Offset::CLASS, Rc::new(Offset));
        provider.register(Affine::CLASS, Rc::new(Affine));
        provider.register(Add::CLASS, Rc::new(Add));
        provider.register(Ramp::CLASS, Rc::new(Ramp));
        provider.register(Collect::CLASS, Rc::new(Collect));
        provider.register(Logger::CLASS, Rc::new(Logger));
        provider
    }

    /// A provider that serves nothing until definitions are registered.
    pub fn empty() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }

    /// Serve `definition` under `class`, replacing any earlier definition of that name.
    pub fn register(&mut self, class: &str, definition: Rc<dyn AccessorDefinition>) {
        self.definitions.insert(class.to_string(), definition);
    }

    pub fn with_definition(mut self, class: &str, definition: Rc<dyn AccessorDefinition>) -> Self {
        self.register(class, definition);
        self
    }

    /// All class names served, sorted.
    pub fn classes(&self) -> Vec<&str> {
        self.definitions.keys().map(String::as_str).collect()
    }
}

impl Default for LibrarySourceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for LibrarySourceProvider {
    fn get_code(&self, name: &str) -> EngineResult<Rc<dyn AccessorDefinition>> {
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                class: name.to_string(),
            })
    }

    fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}
