// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default tick period of `timers/Ramp` (milliseconds)
pub const DEFAULT_RAMP_INTERVAL_MS: u64 = 1_000;
/// How long the CLI runs a swarmlet when `--duration-ms` is not given (milliseconds)
pub const DEFAULT_RUN_DURATION_MS: u64 = 1_000;
/// Separator between an accessor name and a port name in connection endpoints
pub const ENDPOINT_SEPARATOR: char = '.';
/// File extensions read as TOML; anything else is read as YAML
pub const TOML_EXTENSIONS: &[&str] = &["toml"];
