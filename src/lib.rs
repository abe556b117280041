// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod accessor;       // accessor instances, ports, reactions
pub mod backends;       // built-in accessor library + timer facilities
pub mod config;         // swarmlet files
pub mod engine;         // host, runtime, scheduler
pub mod errors;         // error handling
pub mod observability;
pub mod traits;         // definition, source and timer abstractions
