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

//! The serialization engine.
//!
//! - **[`Engine`]**: registry, defaults and top-level operations.
//! - **[`Session`]**: what serializers see while a graph is in flight.
//! - **[`EngineConfig`]**: behavior switches.
//! - **[`InstantiatorStrategy`]** and **[`SerializerFactory`]**: pluggable
//!   instance creation and default serializer selection.

mod config;
mod engine;
mod factory;
mod instantiator;
mod session;

pub use config::{EngineConfig, ReferenceStrategy};
pub use engine::Engine;
pub use factory::{
    CompatibleFieldSerializerFactory, FieldSerializerFactory, FnSerializerFactory,
    SerializerFactory, SharedSerializerFactory, TaggedFieldSerializerFactory,
};
pub use instantiator::{
    ConstructorInstantiator, FactoryInstantiator, InstantiatorStrategy, ZeroInstantiator,
};
pub use session::{GraphContext, Session};
