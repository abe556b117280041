// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod coercion;
mod config;
mod engine;

pub use coercion::CoercionError;
pub use config::{ConfigError, ValidationError};
pub use engine::{EngineError, EngineResult, Hook, PortKind};
