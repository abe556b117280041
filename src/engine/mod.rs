// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod event_queue;
pub mod host;
pub mod scheduler;

pub use event_queue::EventQueue;
pub use host::{Host, Runtime};
pub use scheduler::PriorityGraph;
