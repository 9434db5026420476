//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Configuration types for engines.

use crate::io::BufferKind;

/// How object identity is tracked within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceStrategy {
    /// Hash lookup by identity; constant time for large graphs.
    #[default]
    Map,
    /// Linear scan over seen objects; cheaper for small graphs.
    List,
}

/// Configuration for an [`Engine`](crate::engine::Engine).
///
/// # Examples
///
/// ```rust
/// use graphwire::engine::{EngineConfig, ReferenceStrategy};
///
/// // Use default configuration
/// let config = EngineConfig::default();
/// assert!(config.references);
///
/// // Customize configuration
/// let config = EngineConfig {
///     registration_required: true,
///     reference_strategy: ReferenceStrategy::List,
///     ..Default::default()
/// };
/// assert!(config.registration_required);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Track object identity so shared and cyclic objects are written once.
    ///
    /// Both sides of a stream must agree on this setting.
    ///
    /// Default: true
    pub references: bool,

    /// Fail on classes that were never registered instead of registering
    /// them implicitly and writing them by name.
    ///
    /// Default: false
    pub registration_required: bool,

    /// Preserve sharing and cycles when copying.
    ///
    /// Default: true
    pub copy_references: bool,

    /// Maximum nesting depth of objects within one graph.
    ///
    /// Default: unlimited
    pub max_depth: usize,

    /// Identity tracking strategy.
    ///
    /// Default: [`ReferenceStrategy::Map`]
    pub reference_strategy: ReferenceStrategy,

    /// Initial size of buffers created by [`Engine::to_bytes`](crate::engine::Engine::to_bytes).
    ///
    /// Default: 256
    pub buffer_size: usize,

    /// Upper bound on growth of those buffers, `None` for unbounded.
    ///
    /// Default: None
    pub max_buffer_size: Option<usize>,

    /// Encoding of buffers created by the engine.
    ///
    /// Default: [`BufferKind::Checked`]
    pub buffer_kind: BufferKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            references: true,
            registration_required: false,
            copy_references: true,
            max_depth: usize::MAX,
            reference_strategy: ReferenceStrategy::Map,
            buffer_size: 256,
            max_buffer_size: None,
            buffer_kind: BufferKind::Checked,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether object identity is tracked.
    #[must_use]
    pub fn with_references(mut self, enable: bool) -> Self {
        self.references = enable;
        self
    }

    /// Sets whether every class must be registered up front.
    #[must_use]
    pub fn with_registration_required(mut self, required: bool) -> Self {
        self.registration_required = required;
        self
    }

    /// Sets whether copies preserve sharing.
    #[must_use]
    pub fn with_copy_references(mut self, enable: bool) -> Self {
        self.copy_references = enable;
        self
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the identity tracking strategy.
    #[must_use]
    pub fn with_reference_strategy(mut self, strategy: ReferenceStrategy) -> Self {
        self.reference_strategy = strategy;
        self
    }

    /// Sets the initial and maximum size of engine-created buffers.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize, max: Option<usize>) -> Self {
        self.buffer_size = size;
        self.max_buffer_size = max;
        self
    }

    /// Sets the encoding of engine-created buffers.
    #[must_use]
    pub fn with_buffer_kind(mut self, kind: BufferKind) -> Self {
        self.buffer_kind = kind;
        self
    }
}
