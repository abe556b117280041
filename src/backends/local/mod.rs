// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod accessors;
pub mod factory;

pub use accessors::*;
pub use factory::LibrarySourceProvider;
