// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::rc::Rc;

use crate::errors::EngineResult;
use crate::traits::AccessorDefinition;

/// Retrieves accessor definitions by qualified class name (for example `math/Scale`).
///
/// Used by `instantiate`, `extend`, `implement` and class-name reification. A provider
/// that does not know a class returns [`crate::errors::EngineError::NotFound`].
pub trait SourceProvider {
    fn get_code(&self, qualified_name: &str) -> EngineResult<Rc<dyn AccessorDefinition>>;

    /// Whether `qualified_name` resolves, without building the definition.
    fn contains(&self, qualified_name: &str) -> bool {
        self.get_code(qualified_name).is_ok()
    }
}
