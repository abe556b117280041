// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::traits::{TimerHandle, Timers};

/// Timers backed by tasks on the current tokio [`tokio::task::LocalSet`].
///
/// Each callback runs in its own local task that waits for its deadline or its
/// cancellation token, whichever comes first. Cancellation is checked first, so a callback
/// never runs once [`Timers::cancel`] returned. Scheduling outside a `LocalSet` panics, as
/// `tokio::task::spawn_local` does.
///
/// # Examples
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use swarmlet::backends::timers::TokioTimers;
/// use swarmlet::traits::Timers;
///
/// # let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
/// let local = tokio::task::LocalSet::new();
/// local.block_on(&runtime, async {
///     let timers = TokioTimers::new();
///     let fired = Rc::new(Cell::new(false));
///     let flag = fired.clone();
///     timers.schedule(Box::new(move || flag.set(true)), Duration::from_millis(1));
///
///     tokio::time::sleep(Duration::from_millis(20)).await;
///     assert!(fired.get());
/// });
/// ```
#[derive(Default)]
pub struct TokioTimers {
    next_handle: Cell<u64>,
    tokens: Rc<RefCell<HashMap<TimerHandle, CancellationToken>>>,
}

impl TokioTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers that have neither fired (for one-shots) nor been cancelled.
    pub fn pending(&self) -> usize {
        self.tokens.borrow().len()
    }

    fn register(&self) -> (TimerHandle, CancellationToken) {
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        let handle = TimerHandle(id);
        let token = CancellationToken::new();
        self.tokens.borrow_mut().insert(handle, token.clone());
        (handle, token)
    }
}

impl Timers for TokioTimers {
    fn schedule(&self, callback: Box<dyn FnOnce()>, delay: Duration) -> TimerHandle {
        let (handle, token) = self.register();
        let tokens = Rc::downgrade(&self.tokens);
        tokio::task::spawn_local(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if token.is_cancelled() {
                        return;
                    }
                    if let Some(tokens) = tokens.upgrade() {
                        tokens.borrow_mut().remove(&handle);
                    }
                    callback();
                }
            }
        });
        handle
    }

    fn schedule_repeating(&self, mut callback: Box<dyn FnMut()>, period: Duration) -> TimerHandle {
        let (handle, token) = self.register();
        tokio::task::spawn_local(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        callback();
                    }
                }
            }
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let token = self.tokens.borrow_mut().remove(&handle);
        if let Some(token) = token {
            token.cancel();
        }
    }
}
