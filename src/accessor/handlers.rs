// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Input handler registrations.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::accessor::Accessor;

/// A registered input handler.
pub type HandlerFn = Rc<dyn Fn(&Accessor) -> anyhow::Result<()>>;

/// Handle returned by `add_input_handler`, used to remove the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerHandle(pub u64);

impl fmt::Display for HandlerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// A handler function together with the extra arguments it was registered with.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use swarmlet::accessor::{Accessor, BoundHandler};
///
/// let handler = BoundHandler::new(
///     |this: &Accessor, args| {
///         this.send("output", args[0].clone())?;
///         Ok(())
///     },
///     vec![json!("fixed")],
/// );
/// assert_eq!(handler.args(), &[json!("fixed")]);
/// ```
#[derive(Clone)]
pub struct BoundHandler {
    target: Rc<dyn Fn(&Accessor, &[Value]) -> anyhow::Result<()>>,
    args: Vec<Value>,
}

impl BoundHandler {
    pub fn new<F>(target: F, args: Vec<Value>) -> Self
    where
        F: Fn(&Accessor, &[Value]) -> anyhow::Result<()> + 'static,
    {
        Self {
            target: Rc::new(target),
            args,
        }
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn invoke(&self, this: &Accessor) -> anyhow::Result<()> {
        (self.target)(this, &self.args)
    }
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler").field("args", &self.args).finish()
    }
}

/// Handlers of one accessor, per input and for any input, in registration order.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    next_handle: u64,
    by_input: HashMap<String, Vec<(HandlerHandle, HandlerFn)>>,
    any_input: Vec<(HandlerHandle, HandlerFn)>,
    index: HashMap<HandlerHandle, Option<String>>,
}

impl HandlerRegistry {
    pub fn add(&mut self, input: Option<&str>, handler: HandlerFn) -> HandlerHandle {
        self.next_handle += 1;
        let handle = HandlerHandle(self.next_handle);
        match input {
            Some(name) => self
                .by_input
                .entry(name.to_string())
                .or_default()
                .push((handle, handler)),
            None => self.any_input.push((handle, handler)),
        }
        self.index.insert(handle, input.map(str::to_string));
        handle
    }

    /// Returns whether the handle was registered.
    pub fn remove(&mut self, handle: HandlerHandle) -> bool {
        let Some(input) = self.index.remove(&handle) else {
            return false;
        };
        let list = match input {
            Some(name) => match self.by_input.get_mut(&name) {
                Some(list) => list,
                None => return true,
            },
            None => &mut self.any_input,
        };
        list.retain(|(registered, _)| *registered != handle);
        true
    }

    pub fn contains(&self, handle: HandlerHandle) -> bool {
        self.index.contains_key(&handle)
    }

    /// Snapshot of the handlers for `input` (or for any input when `None`).
    pub fn snapshot(&self, input: Option<&str>) -> Vec<(HandlerHandle, HandlerFn)> {
        match input {
            Some(name) => self.by_input.get(name).cloned().unwrap_or_default(),
            None => self.any_input.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn clear(&mut self) {
        self.by_input.clear();
        self.any_input.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> HandlerFn {
        Rc::new(|_: &Accessor| -> anyhow::Result<()> { Ok(()) })
    }

    #[test]
    fn test_handles_are_unique_and_ordered() {
        let mut registry = HandlerRegistry::default();
        let first = registry.add(Some("a"), noop());
        let second = registry.add(Some("a"), noop());
        let any = registry.add(None, noop());

        assert!(first < second && second < any);
        let handles: Vec<_> = registry.snapshot(Some("a")).into_iter().map(|(h, _)| h).collect();
        assert_eq!(handles, vec![first, second]);
        assert_eq!(registry.snapshot(None).len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut registry = HandlerRegistry::default();
        let first = registry.add(Some("a"), noop());
        let any = registry.add(None, noop());

        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert!(registry.remove(any));
        assert!(registry.snapshot(Some("a")).is_empty());
        assert!(registry.snapshot(None).is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_clear_keeps_handle_counter() {
        let mut registry = HandlerRegistry::default();
        let before = registry.add(Some("a"), noop());
        registry.clear();
        let after = registry.add(Some("a"), noop());

        assert!(!registry.contains(before));
        assert_ne!(before, after);
    }
}
