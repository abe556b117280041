// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Implementations of the collaborators the engine consumes.
//!
//! # Available Backends
//!
//! ## Local Backend
//! Built-in accessor definitions served by [`local::LibrarySourceProvider`]:
//! - **Forwarding**: `identity`
//! - **Arithmetic**: `math/Scale`, `math/Offset`, `math/Affine`, `math/Add`
//! - **Sources**: `timers/Ramp`, a spontaneous counter
//! - **Sinks**: `util/Collect`, `util/Logger`
//!
//! ## Timers
//! Timer facility implementations:
//! - [`timers::ManualTimers`]: virtual time, pumped explicitly. Deterministic.
//! - [`timers::TokioTimers`]: local tasks on a tokio `LocalSet`.
//!
//! # Examples
//!
//! ```rust
//! use std::rc::Rc;
//! use serde_json::json;
//! use swarmlet::backends::local::LibrarySourceProvider;
//! use swarmlet::backends::timers::ManualTimers;
//! use swarmlet::engine::Runtime;
//!
//! let mut runtime = Runtime::new(
//!     Rc::new(LibrarySourceProvider::new()),
//!     Rc::new(ManualTimers::new()),
//! );
//! let offset = runtime.instantiate("offset", "math/Offset")?;
//! offset.set_parameter("offset", json!(5))?;
//! offset.initialize()?;
//! offset.provide_input("input", json!(1))?;
//! offset.react(None)?;
//! assert_eq!(offset.latest_output("output")?, json!(6));
//! # Ok::<(), swarmlet::errors::EngineError>(())
//! ```

pub mod local;
pub mod timers;
