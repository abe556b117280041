// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Priority-ordered queue of pending reactions.
//!
//! A composite accessor keeps one [`EventQueue`] of the contained accessors that have a
//! reaction pending in the current macro-step. Entries are kept sorted by ascending
//! priority (a lower number reacts first) and each item appears at most once, no matter
//! how many of its inputs received values.
//!
//! # Insertion from the tail
//!
//! Scheduling during a reaction almost always targets something downstream of the
//! accessor that is currently reacting, so the new entry typically belongs at or near the
//! back of the queue. Insertion therefore scans from the tail towards the head.
//!
//! # Examples
//!
//! ```rust
//! use swarmlet::engine::EventQueue;
//!
//! let mut queue = EventQueue::new();
//! assert!(queue.schedule("sink", 3));
//! assert!(queue.schedule("source", 0));
//! assert!(queue.schedule("filter", 1));
//!
//! // Scheduling again is a no-op.
//! assert!(!queue.schedule("filter", 1));
//!
//! assert_eq!(queue.pop_front(), Some("source"));
//! assert_eq!(queue.pop_front(), Some("filter"));
//! assert_eq!(queue.pop_front(), Some("sink"));
//! assert_eq!(queue.pop_front(), None);
//! ```

use std::collections::VecDeque;

/// Sorted list of distinct items with their priorities.
#[derive(Debug, Clone)]
pub struct EventQueue<T> {
    entries: VecDeque<(i64, T)>,
}

impl<T: PartialEq> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Insert `item` at its priority position.
    ///
    /// Returns `false` when the item is already queued. Items with equal priority keep
    /// their insertion order.
    pub fn schedule(&mut self, item: T, priority: i64) -> bool {
        if self.contains(&item) {
            return false;
        }
        let mut position = self.entries.len();
        while position > 0 && self.entries[position - 1].0 > priority {
            position -= 1;
        }
        self.entries.insert(position, (priority, item));
        true
    }

    /// Remove and return the lowest-priority item.
    pub fn pop_front(&mut self) -> Option<T> {
        self.entries.pop_front().map(|(_, item)| item)
    }

    /// Priority of the entry that would be popped next.
    pub fn peek_priority(&self) -> Option<i64> {
        self.entries.front().map(|(priority, _)| *priority)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.entries.iter().rev().any(|(_, queued)| queued == item)
    }

    /// Drop a queued item, returning whether it was present.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.entries.iter().position(|(_, queued)| queued == item) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over queued items in reaction order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|(_, item)| item)
    }
}

impl<T: PartialEq> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
