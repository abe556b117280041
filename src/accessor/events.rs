// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lifecycle notifications emitted by accessors.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

/// The fixed set of notifications an accessor emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InitializeStart,
    InitializeEnd,
    ReactStart,
    ReactEnd,
    WrapupStart,
    WrapupEnd,
    Output,
    Reified,
    Unreified,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::InitializeStart => "initializeStart",
            EventKind::InitializeEnd => "initializeEnd",
            EventKind::ReactStart => "reactStart",
            EventKind::ReactEnd => "reactEnd",
            EventKind::WrapupStart => "wrapupStart",
            EventKind::WrapupEnd => "wrapupEnd",
            EventKind::Output => "output",
            EventKind::Reified => "reified",
            EventKind::Unreified => "unreified",
        };
        write!(f, "{}", name)
    }
}

/// A notification with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessorEvent {
    InitializeStart,
    InitializeEnd,
    ReactStart,
    ReactEnd,
    WrapupStart,
    WrapupEnd,
    /// A value was sent through an output.
    Output { name: String, value: Value },
    /// A mutable was bound to `accessor`.
    Reified { accessor: String },
    /// A mutable released `accessor`.
    Unreified { accessor: String },
}

impl AccessorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AccessorEvent::InitializeStart => EventKind::InitializeStart,
            AccessorEvent::InitializeEnd => EventKind::InitializeEnd,
            AccessorEvent::ReactStart => EventKind::ReactStart,
            AccessorEvent::ReactEnd => EventKind::ReactEnd,
            AccessorEvent::WrapupStart => EventKind::WrapupStart,
            AccessorEvent::WrapupEnd => EventKind::WrapupEnd,
            AccessorEvent::Output { .. } => EventKind::Output,
            AccessorEvent::Reified { .. } => EventKind::Reified,
            AccessorEvent::Unreified { .. } => EventKind::Unreified,
        }
    }
}

pub type Listener = Rc<dyn Fn(&AccessorEvent)>;

/// Identifies a listener registration for `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Default)]
pub(crate) struct EventListeners {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
}

impl EventListeners {
    pub fn add(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.by_kind.entry(kind).or_default().push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        for listeners in self.by_kind.values_mut() {
            let before = listeners.len();
            listeners.retain(|(registered, _)| *registered != id);
            if listeners.len() != before {
                return true;
            }
        }
        false
    }

    pub fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        self.by_kind
            .get(&kind)
            .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }
}
