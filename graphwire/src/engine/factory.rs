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

//! Serializer factories.
//!
//! A factory builds the serializer for a class the first time the engine needs
//! one, either for an explicit registration without a serializer or for an
//! implicit registration while registration is optional.

use crate::model::Class;
use crate::serializers::field::{
    CompatibleFieldSerializer, FieldSerializer, FieldSerializerConfig, TaggedFieldSerializer,
};
use crate::serializers::Serializer;
use std::fmt;
use std::sync::Arc;

/// Builds serializers for classes.
pub trait SerializerFactory: Send + Sync {
    /// Creates the serializer for `class`.
    fn make_serializer(&self, class: &Class) -> Arc<dyn Serializer>;
}

/// Builds a [`FieldSerializer`]; the engine's fallback factory.
#[derive(Debug, Clone, Default)]
pub struct FieldSerializerFactory {
    config: FieldSerializerConfig,
}

impl FieldSerializerFactory {
    /// Creates a factory that applies `config` to every serializer it builds.
    #[must_use]
    pub fn new(config: FieldSerializerConfig) -> Self {
        Self { config }
    }
}

impl SerializerFactory for FieldSerializerFactory {
    fn make_serializer(&self, class: &Class) -> Arc<dyn Serializer> {
        Arc::new(FieldSerializer::with_config(class, self.config.clone()))
    }
}

/// Builds a [`CompatibleFieldSerializer`].
#[derive(Debug, Clone, Default)]
pub struct CompatibleFieldSerializerFactory {
    config: FieldSerializerConfig,
}

impl CompatibleFieldSerializerFactory {
    /// Creates a factory that applies `config` to every serializer it builds.
    #[must_use]
    pub fn new(config: FieldSerializerConfig) -> Self {
        Self { config }
    }
}

impl SerializerFactory for CompatibleFieldSerializerFactory {
    fn make_serializer(&self, class: &Class) -> Arc<dyn Serializer> {
        Arc::new(CompatibleFieldSerializer::with_config(class, self.config.clone()))
    }
}

/// Builds a [`TaggedFieldSerializer`].
#[derive(Debug, Clone, Default)]
pub struct TaggedFieldSerializerFactory {
    config: FieldSerializerConfig,
}

impl TaggedFieldSerializerFactory {
    /// Creates a factory that applies `config` to every serializer it builds.
    #[must_use]
    pub fn new(config: FieldSerializerConfig) -> Self {
        Self { config }
    }
}

impl SerializerFactory for TaggedFieldSerializerFactory {
    fn make_serializer(&self, class: &Class) -> Arc<dyn Serializer> {
        Arc::new(TaggedFieldSerializer::with_config(class, self.config.clone()))
    }
}

/// Hands out one serializer instance for every class.
#[derive(Clone)]
pub struct SharedSerializerFactory {
    serializer: Arc<dyn Serializer>,
}

impl SharedSerializerFactory {
    /// Shares `serializer` between all classes.
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }
}

impl SerializerFactory for SharedSerializerFactory {
    fn make_serializer(&self, _class: &Class) -> Arc<dyn Serializer> {
        Arc::clone(&self.serializer)
    }
}

impl fmt::Debug for SharedSerializerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSerializerFactory")
            .field("serializer", &self.serializer.name())
            .finish()
    }
}

/// Builds serializers with a closure.
pub struct FnSerializerFactory<F> {
    make: F,
}

impl<F> FnSerializerFactory<F>
where
    F: Fn(&Class) -> Arc<dyn Serializer> + Send + Sync,
{
    /// Wraps `make`.
    pub fn new(make: F) -> Self {
        Self { make }
    }
}

impl<F> SerializerFactory for FnSerializerFactory<F>
where
    F: Fn(&Class) -> Arc<dyn Serializer> + Send + Sync,
{
    fn make_serializer(&self, class: &Class) -> Arc<dyn Serializer> {
        (self.make)(class)
    }
}

impl<F> fmt::Debug for FnSerializerFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSerializerFactory").finish_non_exhaustive()
    }
}
