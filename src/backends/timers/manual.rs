// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::traits::{TimerHandle, Timers};

/// Upper bound on callbacks run by one [`ManualTimers::run_until_idle`] call.
pub const MAX_IDLE_STEPS: usize = 10_000;

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeating {
        callback: Box<dyn FnMut()>,
        period: Duration,
    },
}

struct Entry {
    handle: TimerHandle,
    task: Task,
}

/// Deterministic event loop on virtual time.
///
/// Nothing runs until the owner pumps the loop with [`ManualTimers::advance`],
/// [`ManualTimers::run_next`] or [`ManualTimers::run_until_idle`]. Entries are keyed by
/// due time and then by scheduling order, which gives FIFO among equal due times.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use swarmlet::backends::timers::ManualTimers;
/// use swarmlet::traits::Timers;
///
/// let timers = ManualTimers::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// for (label, delay) in [("late", 20), ("early", 10), ("also early", 10)] {
///     let log = log.clone();
///     timers.schedule(Box::new(move || log.borrow_mut().push(label)), Duration::from_millis(delay));
/// }
///
/// timers.advance(Duration::from_millis(15));
/// assert_eq!(*log.borrow(), vec!["early", "also early"]);
/// assert_eq!(timers.pending(), 1);
/// ```
#[derive(Default)]
pub struct ManualTimers {
    now: Cell<Duration>,
    next_handle: Cell<u64>,
    next_seq: Cell<u64>,
    entries: RefCell<BTreeMap<(Duration, u64), Entry>>,
    running: Cell<Option<TimerHandle>>,
    running_cancelled: Cell<bool>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.entries.borrow().len()
    }

    fn insert(&self, due: Duration, entry: Entry) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.entries.borrow_mut().insert((due, seq), entry);
    }

    fn allocate(&self) -> TimerHandle {
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        TimerHandle(id)
    }

    fn next_due(&self) -> Option<Duration> {
        self.entries.borrow().keys().next().map(|(due, _)| *due)
    }

    /// Run the earliest callback, moving virtual time forward to its due time.
    /// Returns false when nothing is pending.
    pub fn run_next(&self) -> bool {
        let next = self.entries.borrow_mut().pop_first();
        let Some(((due, _), entry)) = next else {
            return false;
        };
        if due > self.now.get() {
            self.now.set(due);
        }

        match entry.task {
            Task::Once(callback) => callback(),
            Task::Repeating {
                mut callback,
                period,
            } => {
                self.running.set(Some(entry.handle));
                self.running_cancelled.set(false);
                callback();
                self.running.set(None);
                if !self.running_cancelled.get() {
                    self.insert(
                        due + period,
                        Entry {
                            handle: entry.handle,
                            task: Task::Repeating { callback, period },
                        },
                    );
                }
            }
        }
        true
    }

    /// Move virtual time forward by `by`, running every callback that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        while self.next_due().map_or(false, |due| due <= target) {
            self.run_next();
        }
        self.now.set(target);
    }

    /// Run callbacks until none is pending or [`MAX_IDLE_STEPS`] ran. Returns the number
    /// of callbacks run.
    pub fn run_until_idle(&self) -> usize {
        let mut steps = 0;
        while steps < MAX_IDLE_STEPS && self.run_next() {
            steps += 1;
        }
        if steps == MAX_IDLE_STEPS && self.pending() > 0 {
            tracing::warn!(
                pending = self.pending(),
                "Timer loop still busy after {} callbacks",
                MAX_IDLE_STEPS
            );
        }
        steps
    }
}

impl Timers for ManualTimers {
    fn schedule(&self, callback: Box<dyn FnOnce()>, delay: Duration) -> TimerHandle {
        let handle = self.allocate();
        self.insert(
            self.now.get() + delay,
            Entry {
                handle,
                task: Task::Once(callback),
            },
        );
        handle
    }

    fn schedule_repeating(&self, callback: Box<dyn FnMut()>, period: Duration) -> TimerHandle {
        let handle = self.allocate();
        self.insert(
            self.now.get() + period,
            Entry {
                handle,
                task: Task::Repeating { callback, period },
            },
        );
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if self.running.get() == Some(handle) {
            self.running_cancelled.set(true);
        }
        // Removed entries drop outside the borrow, since a callback may own accessors.
        let removed: Vec<Entry> = {
            let mut entries = self.entries.borrow_mut();
            let keys: Vec<_> = entries
                .iter()
                .filter(|(_, entry)| entry.handle == handle)
                .map(|(key, _)| *key)
                .collect();
            keys.iter().filter_map(|key| entries.remove(key)).collect()
        };
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |n: u32| {
            let sink = sink.clone();
            Box::new(move || sink.borrow_mut().push(n)) as Box<dyn FnOnce()>
        };
        (log, make)
    }

    #[test]
    fn test_due_order_then_fifo() {
        let timers = ManualTimers::new();
        let (log, make) = recorder();

        let cases = [(1, 30), (2, 10), (3, 10), (4, 0), (5, 30)];
        for (n, delay) in cases {
            timers.schedule(make(n), Duration::from_millis(delay));
        }

        assert_eq!(timers.run_until_idle(), 5);
        assert_eq!(*log.borrow(), vec![4, 2, 3, 1, 5]);
        assert_eq!(timers.now(), Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let timers = ManualTimers::new();
        let (log, make) = recorder();
        let handle = timers.schedule(make(1), Duration::from_millis(5));
        timers.schedule(make(2), Duration::from_millis(5));

        timers.cancel(handle);
        timers.cancel(handle);
        timers.run_until_idle();
        timers.cancel(handle);

        assert_eq!(*log.borrow(), vec![2]);
    }

    #[test]
    fn test_callback_scheduled_during_run_waits_its_turn() {
        let timers = Rc::new(ManualTimers::new());
        let (log, make) = recorder();
        let make = Rc::new(make);

        let inner_timers = timers.clone();
        let inner_make = make.clone();
        timers.schedule(
            Box::new(move || {
                inner_timers.schedule(inner_make(2), Duration::ZERO);
            }),
            Duration::ZERO,
        );
        timers.schedule(make(1), Duration::ZERO);

        timers.run_until_idle();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_repeating_until_cancelled_from_inside() {
        let timers = Rc::new(ManualTimers::new());
        let ticks = Rc::new(Cell::new(0));
        let handle = Rc::new(Cell::new(None));

        let counter = ticks.clone();
        let inner_timers = timers.clone();
        let own = handle.clone();
        let h = timers.schedule_repeating(
            Box::new(move || {
                counter.set(counter.get() + 1);
                if counter.get() == 3 {
                    if let Some(h) = own.get() {
                        inner_timers.cancel(h);
                    }
                }
            }),
            Duration::from_millis(10),
        );
        handle.set(Some(h));

        timers.advance(Duration::from_millis(100));
        assert_eq!(ticks.get(), 3);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_advance_stops_at_target() {
        let timers = ManualTimers::new();
        let (log, make) = recorder();
        timers.schedule(make(1), Duration::from_millis(10));
        timers.schedule(make(2), Duration::from_millis(11));

        timers.advance(Duration::from_millis(10));
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(timers.now(), Duration::from_millis(10));

        timers.advance(Duration::from_millis(1));
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_run_until_idle_is_bounded_by_repeating_timers() {
        let timers = ManualTimers::new();
        timers.schedule_repeating(Box::new(|| {}), Duration::from_millis(1));
        assert_eq!(timers.run_until_idle(), MAX_IDLE_STEPS);
        assert_eq!(timers.pending(), 1);
    }
}
