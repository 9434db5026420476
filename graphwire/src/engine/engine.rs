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

//! The engine: registrations, defaults and top-level operations.

use super::config::{EngineConfig, ReferenceStrategy};
use super::factory::{FieldSerializerFactory, SerializerFactory, SharedSerializerFactory};
use super::instantiator::{ConstructorInstantiator, InstantiatorStrategy};
use super::session::{Session, SessionState};
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, ClassKind, ObjectRef, PrimitiveKind, Value};
use crate::observability::{log_error, EngineMetrics};
use crate::resolver::{ClassResolver, Registration, RegistrationId, MAX_REGISTRATION_ID};
use crate::serializers::{
    CollectionSerializer, MapSerializer, ObjectArraySerializer, PrimitiveArraySerializer,
    PrimitiveSerializer, Serializer, StringSerializer,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Registration ids assigned to the built-in classes, in id order.
const BUILT_IN: [Option<PrimitiveKind>; 9] = [
    Some(PrimitiveKind::Int),
    None,
    Some(PrimitiveKind::Float),
    Some(PrimitiveKind::Bool),
    Some(PrimitiveKind::Byte),
    Some(PrimitiveKind::Char),
    Some(PrimitiveKind::Short),
    Some(PrimitiveKind::Long),
    Some(PrimitiveKind::Double),
];

/// Shared, session-independent part of an engine.
pub(crate) struct Core {
    pub(crate) config: EngineConfig,
    pub(crate) classes: ClassResolver,
    pub(crate) instantiator: Arc<dyn InstantiatorStrategy>,
    pub(crate) metrics: Arc<EngineMetrics>,
    defaults: Vec<(Class, Arc<dyn SerializerFactory>)>,
    default_factory: Arc<dyn SerializerFactory>,
}

impl Core {
    pub(crate) fn registration(&self, class: &Class) -> Result<Arc<Registration>> {
        if let Some(registration) = self.classes.registration(class) {
            return Ok(registration);
        }
        if self.config.registration_required {
            return Err(GraphError::unregistered(format!(
                "Class is not registered: {}",
                class.name()
            )));
        }
        tracing::debug!(class = class.name(), "Registering class implicitly");
        Ok(self
            .classes
            .register_implicit(class, self.default_serializer(class)))
    }

    pub(crate) fn default_serializer(&self, class: &Class) -> Arc<dyn Serializer> {
        if let Some((_, factory)) = self
            .defaults
            .iter()
            .find(|(base, _)| base.is_assignable_from(class))
        {
            return factory.make_serializer(class);
        }
        match class.kind() {
            ClassKind::Primitive(kind) | ClassKind::Boxed(kind) => Arc::new(PrimitiveSerializer::new(*kind)),
            ClassKind::String => Arc::new(StringSerializer),
            ClassKind::Collection => Arc::new(CollectionSerializer::new()),
            ClassKind::Map => Arc::new(MapSerializer::new()),
            ClassKind::Array(component) => match component.kind() {
                ClassKind::Primitive(kind) => Arc::new(PrimitiveArraySerializer::new(*kind)),
                _ => Arc::new(ObjectArraySerializer::new()),
            },
            ClassKind::Object => self.default_factory.make_serializer(class),
        }
    }
}

/// A serialization engine.
///
/// The engine owns the class registry and the state of the session in
/// progress. Every top-level operation starts a new session: identities and
/// class names seen by one call are never visible to the next.
///
/// An engine is not thread safe; use one engine per thread.
///
/// # Examples
///
/// ```rust
/// use graphwire::engine::Engine;
/// use graphwire::model::{Class, FieldDef, PrimitiveKind, Value};
///
/// let point = Class::builder("demo.Point")
///     .field(FieldDef::new("x", Class::primitive(PrimitiveKind::Int)))
///     .field(FieldDef::new("y", Class::primitive(PrimitiveKind::Int)))
///     .build();
///
/// let mut engine = Engine::new();
/// engine.register(&point);
///
/// let value = Value::object(&point);
/// value.as_object().unwrap().borrow_mut().set("x", 3).unwrap();
///
/// let bytes = engine.to_bytes(&value).unwrap();
/// let back = engine.from_bytes(&bytes).unwrap();
/// assert_eq!(back, value);
/// ```
pub struct Engine {
    core: Core,
    state: SessionState,
    next_id: u32,
}

impl Engine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with `config`.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let state = SessionState::new(config.reference_strategy);
        let mut engine = Self {
            core: Core {
                config,
                classes: ClassResolver::new(),
                instantiator: Arc::new(ConstructorInstantiator),
                metrics: Arc::new(EngineMetrics::new()),
                defaults: Vec::new(),
                default_factory: Arc::new(FieldSerializerFactory::default()),
            },
            state,
            next_id: 0,
        };
        for (id, kind) in (0u32..).zip(BUILT_IN) {
            let (class, serializer): (Class, Arc<dyn Serializer>) = match kind {
                Some(kind) => (Class::primitive(kind), Arc::new(PrimitiveSerializer::new(kind))),
                None => (Class::string(), Arc::new(StringSerializer)),
            };
            engine
                .core
                .classes
                .register(Registration::new(class, serializer, RegistrationId::Id(id)));
        }
        engine
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.core.config
    }

    /// Counters of this engine.
    #[must_use]
    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.core.metrics
    }

    /// Sets whether object identity is tracked.
    pub fn set_references(&mut self, enable: bool) {
        self.core.config.references = enable;
    }

    /// Sets whether every class must be registered up front.
    pub fn set_registration_required(&mut self, required: bool) {
        self.core.config.registration_required = required;
    }

    /// Sets whether copies preserve sharing.
    pub fn set_copy_references(&mut self, enable: bool) {
        self.core.config.copy_references = enable;
    }

    /// Sets the maximum nesting depth.
    pub fn set_max_depth(&mut self, depth: usize) {
        self.core.config.max_depth = depth;
    }

    /// Switches the identity tracking strategy.
    pub fn set_reference_strategy(&mut self, strategy: ReferenceStrategy) {
        self.core.config.reference_strategy = strategy;
        self.state = SessionState::new(strategy);
    }

    /// Replaces the instantiation strategy.
    pub fn set_instantiator(&mut self, instantiator: impl InstantiatorStrategy + 'static) {
        self.core.instantiator = Arc::new(instantiator);
    }

    /// Replaces the factory used for plain object classes with no other
    /// default.
    pub fn set_default_serializer(&mut self, factory: impl SerializerFactory + 'static) {
        self.core.default_factory = Arc::new(factory);
    }

    /// Uses `factory` for `base` and every class assignable to it. Entries are
    /// consulted in the order they were added, ahead of the built-in defaults.
    pub fn add_default_serializer(&mut self, base: &Class, factory: impl SerializerFactory + 'static) {
        self.core.defaults.push((base.clone(), Arc::new(factory)));
    }

    /// Uses one `serializer` instance for `base` and every class assignable to it.
    pub fn add_default_serializer_instance(&mut self, base: &Class, serializer: Arc<dyn Serializer>) {
        self.add_default_serializer(base, SharedSerializerFactory::new(serializer));
    }

    /// The serializer that a first registration of `class` would use.
    #[must_use]
    pub fn default_serializer(&self, class: &Class) -> Arc<dyn Serializer> {
        self.core.default_serializer(class)
    }

    /// The lowest unused registration id.
    #[must_use]
    pub fn next_registration_id(&self) -> u32 {
        let mut id = self.next_id;
        while self.core.classes.is_id_taken(id) {
            id += 1;
        }
        id
    }

    /// Registers `class` with its default serializer and the next free id.
    /// Returns the existing registration if there is one.
    pub fn register(&mut self, class: &Class) -> Arc<Registration> {
        if let Some(registration) = self.core.classes.registration(class) {
            return registration;
        }
        let serializer = self.core.default_serializer(class);
        self.register_next(class, serializer)
    }

    /// Registers `class` with `serializer`. An existing registration keeps its
    /// id and gets the new serializer.
    pub fn register_with(&mut self, class: &Class, serializer: Arc<dyn Serializer>) -> Arc<Registration> {
        if let Some(existing) = self.core.classes.registration(class) {
            if Arc::ptr_eq(existing.serializer(), &serializer) {
                return existing;
            }
            return self
                .core
                .classes
                .register(Registration::new(class.clone(), serializer, existing.id()));
        }
        self.register_next(class, serializer)
    }

    fn register_next(&mut self, class: &Class, serializer: Arc<dyn Serializer>) -> Arc<Registration> {
        let id = self.next_registration_id();
        self.next_id = id + 1;
        self.core
            .classes
            .register(Registration::new(class.clone(), serializer, RegistrationId::Id(id)))
    }

    /// Registers `class` under an explicit `id`, with `serializer` or the
    /// default serializer.
    ///
    /// # Errors
    ///
    /// Fails when the id does not fit the wire encoding or is taken by a
    /// different class.
    pub fn register_with_id(
        &mut self,
        class: &Class,
        serializer: Option<Arc<dyn Serializer>>,
        id: u32,
    ) -> Result<Arc<Registration>> {
        let serializer = serializer.unwrap_or_else(|| self.core.default_serializer(class));
        self.register_registration(Registration::new(class.clone(), serializer, RegistrationId::Id(id)))
    }

    /// Stores a prepared registration.
    ///
    /// # Errors
    ///
    /// Fails when the id does not fit the wire encoding or is taken by a
    /// different class.
    pub fn register_registration(&mut self, registration: Registration) -> Result<Arc<Registration>> {
        if let RegistrationId::Id(id) = registration.id() {
            if id > MAX_REGISTRATION_ID {
                return Err(GraphError::invalid_argument(format!(
                    "Registration id out of range: {id}"
                )));
            }
            if let Some(existing) = self.core.classes.registration_by_id(id) {
                if existing.class() != registration.class() {
                    return Err(GraphError::invalid_argument(format!(
                        "An existing registration with a different class already uses ID: {id} ({})",
                        existing.class()
                    )));
                }
            }
        }
        Ok(self.core.classes.register(registration))
    }

    /// Makes `class` resolvable by name, for reading classes that the writer
    /// registered implicitly.
    pub fn define(&mut self, class: &Class) {
        self.core.classes.define(class);
    }

    /// The registration of `class`, registering it implicitly when
    /// registration is optional.
    ///
    /// # Errors
    ///
    /// Fails when the class is unregistered and registration is required.
    pub fn registration(&self, class: &Class) -> Result<Arc<Registration>> {
        self.core.registration(class)
    }

    /// The registration with numeric `id`.
    #[must_use]
    pub fn registration_by_id(&self, id: u32) -> Option<Arc<Registration>> {
        self.core.classes.registration_by_id(id)
    }

    /// The serializer of `class`.
    ///
    /// # Errors
    ///
    /// Fails like [`registration`](Self::registration).
    pub fn serializer(&self, class: &Class) -> Result<Arc<dyn Serializer>> {
        Ok(Arc::clone(self.core.registration(class)?.serializer()))
    }

    /// Creates an empty instance of `class`.
    ///
    /// # Errors
    ///
    /// Returns an instantiation error for classes that cannot have instances.
    pub fn new_instance(&self, class: &Class) -> Result<ObjectRef> {
        self.core.instantiator.new_instance(class)
    }

    /// Clears all session state: seen objects, session class names and graph
    /// context.
    pub fn reset(&mut self) {
        self.state.reset(self.core.config.registration_required);
    }

    fn session<T>(&mut self, f: impl FnOnce(&mut Session<'_>) -> Result<T>) -> Result<T> {
        self.state.reset(self.core.config.registration_required);
        trace!(references = self.core.config.references, "starting graph session");
        let mut session = Session::new(&self.core, &mut self.state);
        let result = f(&mut session);
        if let Err(error) = &result {
            self.core.metrics.record_error();
            log_error(error);
        }
        result
    }

    fn write_session(
        &mut self,
        output: &mut Output<'_>,
        f: impl FnOnce(&mut Session<'_>, &mut Output<'_>) -> Result<()>,
    ) -> Result<()> {
        let start = output.total();
        self.session(|session| f(session, output))?;
        let bytes = output.total() - start;
        self.core.metrics.record_graph_written(bytes);
        debug!(bytes, "wrote object graph");
        Ok(())
    }

    fn read_session(
        &mut self,
        input: &mut Input<'_>,
        f: impl FnOnce(&mut Session<'_>, &mut Input<'_>) -> Result<Value>,
    ) -> Result<Value> {
        let start = input.total();
        let value = self.session(|session| f(session, input))?;
        let bytes = input.total() - start;
        self.core.metrics.record_graph_read(bytes);
        debug!(bytes, "read object graph");
        Ok(value)
    }

    /// Writes a non-null object whose class the reader knows.
    ///
    /// # Errors
    ///
    /// Fails for null values, on unregistered classes when registration is
    /// required, and on any serializer or buffer error.
    pub fn write_object(&mut self, output: &mut Output<'_>, value: &Value) -> Result<()> {
        self.write_session(output, |session, output| session.write_object(output, value))
    }

    /// Writes a non-null object with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails like [`write_object`](Self::write_object).
    pub fn write_object_with(
        &mut self,
        output: &mut Output<'_>,
        value: &Value,
        serializer: &dyn Serializer,
    ) -> Result<()> {
        self.write_session(output, |session, output| {
            session.write_object_with(output, value, serializer, &[])
        })
    }

    /// Writes a possibly-null object of statically known `class`.
    ///
    /// # Errors
    ///
    /// Fails like [`write_object`](Self::write_object), except for null.
    pub fn write_object_or_null(&mut self, output: &mut Output<'_>, value: &Value, class: &Class) -> Result<()> {
        self.write_session(output, |session, output| {
            session.write_object_or_null(output, value, class)
        })
    }

    /// Writes a possibly-null object with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails like [`write_object`](Self::write_object), except for null.
    pub fn write_object_or_null_with(
        &mut self,
        output: &mut Output<'_>,
        value: &Value,
        serializer: &dyn Serializer,
    ) -> Result<()> {
        self.write_session(output, |session, output| {
            session.write_object_or_null_with(output, value, serializer, &[])
        })
    }

    /// Writes the class of `value` followed by the object.
    ///
    /// # Errors
    ///
    /// Fails on unregistered classes when registration is required, and on
    /// any serializer or buffer error.
    pub fn write_class_and_object(&mut self, output: &mut Output<'_>, value: &Value) -> Result<()> {
        self.write_session(output, |session, output| {
            session.write_class_and_object(output, value)
        })
    }

    /// Reads a non-null object of `class`.
    ///
    /// # Errors
    ///
    /// Fails on malformed or truncated input and any serializer error.
    pub fn read_object(&mut self, input: &mut Input<'_>, class: &Class) -> Result<Value> {
        self.read_session(input, |session, input| session.read_object(input, class))
    }

    /// Reads a non-null object of `class` with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails like [`read_object`](Self::read_object).
    pub fn read_object_with(
        &mut self,
        input: &mut Input<'_>,
        class: &Class,
        serializer: &dyn Serializer,
    ) -> Result<Value> {
        self.read_session(input, |session, input| {
            session.read_object_with(input, class, serializer, &[])
        })
    }

    /// Reads a possibly-null object of `class`.
    ///
    /// # Errors
    ///
    /// Fails like [`read_object`](Self::read_object).
    pub fn read_object_or_null(&mut self, input: &mut Input<'_>, class: &Class) -> Result<Value> {
        self.read_session(input, |session, input| {
            session.read_object_or_null(input, class)
        })
    }

    /// Reads a possibly-null object of `class` with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails like [`read_object`](Self::read_object).
    pub fn read_object_or_null_with(
        &mut self,
        input: &mut Input<'_>,
        class: &Class,
        serializer: &dyn Serializer,
    ) -> Result<Value> {
        self.read_session(input, |session, input| {
            session.read_object_or_null_with(input, class, serializer, &[])
        })
    }

    /// Reads a class identity and an object of that class.
    ///
    /// # Errors
    ///
    /// Fails on unknown classes, malformed input and any serializer error.
    pub fn read_class_and_object(&mut self, input: &mut Input<'_>) -> Result<Value> {
        self.read_session(input, |session, input| session.read_class_and_object(input))
    }

    /// Encodes `value` with its class into a fresh buffer sized by the
    /// configuration.
    ///
    /// # Errors
    ///
    /// Fails like [`write_class_and_object`](Self::write_class_and_object),
    /// or with a buffer overflow past `max_buffer_size`.
    pub fn to_bytes(&mut self, value: &Value) -> Result<Vec<u8>> {
        let mut output = Output::new(self.core.config.buffer_size, self.core.config.max_buffer_size)
            .with_kind(self.core.config.buffer_kind);
        self.write_class_and_object(&mut output, value)?;
        Ok(output.into_bytes())
    }

    /// Decodes a value written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Fails like [`read_class_and_object`](Self::read_class_and_object).
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<Value> {
        let mut input = Input::new(bytes).with_kind(self.core.config.buffer_kind);
        self.read_class_and_object(&mut input)
    }

    /// Deep-copies `value` without going through bytes.
    ///
    /// # Errors
    ///
    /// Fails when a serializer in the graph cannot copy.
    pub fn copy(&mut self, value: &Value) -> Result<Value> {
        self.session(|session| session.copy(value))
    }

    /// Copies the root of `value`, sharing everything it refers to.
    ///
    /// # Errors
    ///
    /// Fails when the root's serializer cannot copy.
    pub fn copy_shallow(&mut self, value: &Value) -> Result<Value> {
        self.session(|session| session.copy_shallow(value))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.core.config)
            .field("classes", &self.core.classes)
            .field("defaults", &self.core.defaults.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDef;

    fn point() -> Class {
        Class::builder("demo.Point")
            .field(FieldDef::new("x", Class::primitive(PrimitiveKind::Int)))
            .field(FieldDef::new("y", Class::primitive(PrimitiveKind::Int)))
            .build()
    }

    #[test]
    fn test_built_in_ids() {
        let engine = Engine::new();
        let expect = [
            (0, "int"),
            (1, "string"),
            (2, "float"),
            (3, "bool"),
            (4, "byte"),
            (5, "char"),
            (6, "short"),
            (7, "long"),
            (8, "double"),
        ];
        for (id, name) in expect {
            assert_eq!(engine.registration_by_id(id).unwrap().class().name(), name);
        }
        assert_eq!(engine.next_registration_id(), 9);
        let boxed = engine.registration(&Class::boxed(PrimitiveKind::Long)).unwrap();
        assert_eq!(boxed.id(), RegistrationId::Id(7));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut engine = Engine::new();
        let first = engine.register(&point());
        let second = engine.register(&point());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id(), RegistrationId::Id(9));
    }

    #[test]
    fn test_register_with_replaces_serializer_keeps_id() {
        let mut engine = Engine::new();
        let first = engine.register(&point());
        let replacement: Arc<dyn Serializer> = Arc::new(StringSerializer);
        let second = engine.register_with(&point(), Arc::clone(&replacement));
        assert_eq!(first.id(), second.id());
        assert!(Arc::ptr_eq(&engine.serializer(&point()).unwrap(), &replacement));
        let third = engine.register_with(&point(), Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&second, &third));
    }

    #[test]
    fn test_register_with_id() {
        let mut engine = Engine::new();
        let registration = engine.register_with_id(&point(), None, 40).unwrap();
        assert_eq!(registration.id(), RegistrationId::Id(40));
        let other = Class::builder("demo.Other").build();
        let err = engine.register_with_id(&other, None, 40).unwrap_err();
        assert!(err.to_string().contains("already uses ID: 40"));
        assert!(engine
            .register_with_id(&other, None, MAX_REGISTRATION_ID + 1)
            .is_err());
    }

    #[test]
    fn test_next_id_skips_taken_ids() {
        let mut engine = Engine::new();
        engine.register_with_id(&point(), None, 9).unwrap();
        let other = engine.register(&Class::builder("demo.Other").build());
        assert_eq!(other.id(), RegistrationId::Id(10));
    }

    #[test]
    fn test_registration_required() {
        let mut engine = Engine::with_config(EngineConfig::new().with_registration_required(true));
        let err = engine.to_bytes(&Value::object(&point())).unwrap_err();
        assert!(err.is_unregistered_class());
        assert!(err.to_string().contains("Class is not registered: demo.Point"));
        assert_eq!(engine.metrics().total_errors(), 1);
    }

    #[test]
    fn test_default_serializer_order() {
        let mut engine = Engine::new();
        let list = Class::builder("demo.List").collection().build();
        assert_eq!(engine.default_serializer(&list).name(), "collection");
        assert_eq!(engine.default_serializer(&point()).name(), "field");
        assert_eq!(
            engine.default_serializer(&Class::array_of(&Class::primitive(PrimitiveKind::Int))).name(),
            "int[]"
        );
        assert_eq!(
            engine.default_serializer(&Class::array_of(&Class::string())).name(),
            "object-array"
        );
        engine.add_default_serializer_instance(&list, Arc::new(StringSerializer));
        let sub = Class::builder("demo.SubList").superclass(&list).build();
        assert_eq!(engine.default_serializer(&sub).name(), "string");
    }

    #[test]
    fn test_implicit_registration_uses_name() {
        let engine = Engine::new();
        let registration = engine.registration(&point()).unwrap();
        assert_eq!(registration.id(), RegistrationId::Name);
    }

    #[test]
    fn test_metrics_count_graphs() {
        let mut engine = Engine::new();
        let bytes = engine.to_bytes(&Value::Int(5)).unwrap();
        engine.from_bytes(&bytes).unwrap();
        assert_eq!(engine.metrics().total_graphs_written(), 1);
        assert_eq!(engine.metrics().total_bytes_written(), bytes.len() as u64);
        assert_eq!(engine.metrics().total_graphs_read(), 1);
        assert_eq!(engine.metrics().total_bytes_read(), bytes.len() as u64);
    }

    #[test]
    fn test_int_root_bytes() {
        let mut engine = Engine::new();
        assert_eq!(engine.to_bytes(&Value::Int(5)).unwrap(), vec![2, 10]);
        assert_eq!(engine.to_bytes(&Value::Null).unwrap(), vec![0]);
        assert!(engine.from_bytes(&[0]).unwrap().is_null());
    }
}
