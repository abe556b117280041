// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::time::Duration;

/// Opaque handle to a scheduled timer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// The host event loop as seen by the engine.
///
/// Implementations must run callbacks in non-decreasing due-time order, FIFO among
/// callbacks with the same due time, and never after [`Timers::cancel`] returned for
/// their handle. Callbacks run to completion on the thread that owns the accessors,
/// which is why they are neither `Send` nor `Sync`.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use swarmlet::backends::timers::ManualTimers;
/// use swarmlet::traits::Timers;
///
/// let timers = ManualTimers::new();
/// let fired = Rc::new(Cell::new(0));
/// let counter = fired.clone();
/// timers.schedule(Box::new(move || counter.set(counter.get() + 1)), Duration::ZERO);
///
/// timers.run_until_idle();
/// assert_eq!(fired.get(), 1);
/// ```
pub trait Timers {
    /// Run `callback` once after `delay`.
    fn schedule(&self, callback: Box<dyn FnOnce()>, delay: Duration) -> TimerHandle;

    /// Run `callback` every `period` until cancelled.
    fn schedule_repeating(&self, callback: Box<dyn FnMut()>, period: Duration) -> TimerHandle;

    /// Cancel a pending callback. Cancelling twice, or cancelling a timer that already
    /// fired, is a no-op.
    fn cancel(&self, handle: TimerHandle);
}
