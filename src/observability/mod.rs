// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability for the accessor engine.
//!
//! Every diagnostic and operational log line goes through a message type in
//! [`messages`]. A message is a plain struct implementing `Display`, so the wording lives
//! in one place, and [`messages::StructuredLog`], so the same event is emitted with
//! structured fields.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::accessor` - instantiation, lifecycle and value flow
//! * `messages::scheduler` - priority assignment and causality loops
//! * `messages::reification` - binding and releasing mutable accessors
//! * `messages::config` - loading, validating and building swarmlets
//!
//! # Usage
//!
//! ```rust
//! use swarmlet::observability::messages::reification::ReificationReleased;
//! use swarmlet::observability::messages::StructuredLog;
//!
//! let msg = ReificationReleased {
//!     mutable: "top.slot",
//!     accessor: "top.slot.Scale",
//! };
//!
//! tracing::info!("{}", msg);
//! msg.log();
//! ```

pub mod messages;
