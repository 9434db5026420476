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

//! Field-by-field serialization of plain objects.
//!
//! [`FieldSerializer`] writes the selected fields of a class back to back with
//! no per-field framing, so the reader must use the exact same class layout.
//! [`CompatibleFieldSerializer`] and [`TaggedFieldSerializer`] build on the
//! same [`CachedField`]s and add framing that tolerates added and removed
//! fields.
//!
//! # Field selection
//!
//! Every instance slot of the class and its superclasses is a candidate.
//! Transient fields are skipped unless `serialize_transient` is set (they are
//! still copied when `copy_transient` is set), non-public fields are skipped
//! when `fields_as_accessible` is off, and `excluded` names are skipped. The
//! remaining fields are ordered by name.

mod access;
mod compatible;
mod tagged;

pub use access::{DirectAccess, FieldAccess, GeneratedAccess, IntrospectiveAccess};
pub use compatible::CompatibleFieldSerializer;
pub use tagged::TaggedFieldSerializer;

use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, FieldDef, ObjectRef, TypeRef, Value};
use crate::serializers::Serializer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// How cached fields reach their slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessStrategy {
    /// Look the slot up by name on every access: [`IntrospectiveAccess`].
    Introspective,
    /// Accessor closures built per field: [`GeneratedAccess`].
    Generated,
    /// Precomputed slot offsets: [`DirectAccess`].
    #[default]
    Direct,
}

/// Options of the field serializer family.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FieldSerializerConfig {
    /// Slot access strategy.
    ///
    /// Default: [`AccessStrategy::Direct`]
    pub access: AccessStrategy,

    /// Whether reference fields may hold null. When false, every non-primitive
    /// field saves its null marker and writing a null fails.
    ///
    /// Default: true
    pub fields_can_be_null: bool,

    /// Treat each declared field class as the exact class of its values, even
    /// when it is not final, saving the per-value class identity.
    ///
    /// Default: false
    pub fixed_field_types: bool,

    /// Serialize transient fields.
    ///
    /// Default: false
    pub serialize_transient: bool,

    /// Copy transient fields.
    ///
    /// Default: true
    pub copy_transient: bool,

    /// Include non-public fields.
    ///
    /// Default: true
    pub fields_as_accessible: bool,

    /// Names of fields to leave out.
    pub excluded: Vec<String>,

    /// Serializers to use for named fields instead of the registered ones.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub bound: HashMap<String, Arc<dyn Serializer>>,
}

impl Default for FieldSerializerConfig {
    fn default() -> Self {
        Self {
            access: AccessStrategy::Direct,
            fields_can_be_null: true,
            fixed_field_types: false,
            serialize_transient: false,
            copy_transient: true,
            fields_as_accessible: true,
            excluded: Vec::new(),
            bound: HashMap::new(),
        }
    }
}

impl FieldSerializerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the slot access strategy.
    #[must_use]
    pub fn with_access(mut self, access: AccessStrategy) -> Self {
        self.access = access;
        self
    }

    /// Sets whether reference fields may hold null.
    #[must_use]
    pub fn with_fields_can_be_null(mut self, can_be_null: bool) -> Self {
        self.fields_can_be_null = can_be_null;
        self
    }

    /// Sets whether declared field classes are exact.
    #[must_use]
    pub fn with_fixed_field_types(mut self, fixed: bool) -> Self {
        self.fixed_field_types = fixed;
        self
    }

    /// Sets whether transient fields are serialized.
    #[must_use]
    pub fn with_serialize_transient(mut self, enable: bool) -> Self {
        self.serialize_transient = enable;
        self
    }

    /// Sets whether transient fields are copied.
    #[must_use]
    pub fn with_copy_transient(mut self, enable: bool) -> Self {
        self.copy_transient = enable;
        self
    }

    /// Sets whether non-public fields are included.
    #[must_use]
    pub fn with_fields_as_accessible(mut self, enable: bool) -> Self {
        self.fields_as_accessible = enable;
        self
    }

    /// Leaves the field called `name` out.
    #[must_use]
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.excluded.push(name.into());
        self
    }

    /// Uses `serializer` for the field called `name`.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, serializer: Arc<dyn Serializer>) -> Self {
        self.bound.insert(name.into(), serializer);
        self
    }
}

impl fmt::Debug for FieldSerializerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&String> = self.bound.keys().collect();
        bound.sort();
        f.debug_struct("FieldSerializerConfig")
            .field("access", &self.access)
            .field("fields_can_be_null", &self.fields_can_be_null)
            .field("fixed_field_types", &self.fixed_field_types)
            .field("serialize_transient", &self.serialize_transient)
            .field("copy_transient", &self.copy_transient)
            .field("fields_as_accessible", &self.fields_as_accessible)
            .field("excluded", &self.excluded)
            .field("bound", &bound)
            .finish()
    }
}

/// One field as the serializer handles it.
#[derive(Clone)]
pub struct CachedField {
    def: FieldDef,
    owner: String,
    access: Arc<dyn FieldAccess>,
    value_class: Option<Class>,
    fixed_types: bool,
    can_be_null: bool,
    serializer: Option<Arc<dyn Serializer>>,
}

impl CachedField {
    fn new(class: &Class, index: usize, config: &FieldSerializerConfig) -> Self {
        let slot = &class.slots()[index];
        let def = slot.def().clone();
        let (value_class, is_primitive) = match def.declared() {
            TypeRef::Class(declared) => {
                let exact = declared.is_final() || (config.fixed_field_types && !declared.is_abstract());
                (exact.then(|| declared.clone()), declared.is_primitive())
            }
            TypeRef::Param(_) => (None, false),
        };
        let access: Arc<dyn FieldAccess> = match config.access {
            AccessStrategy::Introspective => Arc::new(IntrospectiveAccess::new(slot.owner(), def.name())),
            AccessStrategy::Generated => Arc::new(GeneratedAccess::for_slot(class, index)),
            AccessStrategy::Direct => Arc::new(DirectAccess::new(index)),
        };
        Self {
            owner: slot.owner().to_string(),
            access,
            value_class,
            fixed_types: config.fixed_field_types,
            can_be_null: config.fields_can_be_null && !is_primitive && !def.is_not_null(),
            serializer: config.bound.get(def.name()).cloned(),
            def,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Name of the declaring class.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The field definition.
    #[must_use]
    pub fn def(&self) -> &FieldDef {
        &self.def
    }

    /// The exact class of the field's values, when known without generics.
    #[must_use]
    pub fn value_class(&self) -> Option<&Class> {
        self.value_class.as_ref()
    }

    /// Whether the field may hold null.
    #[must_use]
    pub fn can_be_null(&self) -> bool {
        self.can_be_null
    }

    /// The serializer bound to this field, if any.
    #[must_use]
    pub fn serializer(&self) -> Option<&Arc<dyn Serializer>> {
        self.serializer.as_ref()
    }

    fn concrete_class(&self, generics: &[Option<Class>]) -> Option<Class> {
        if let Some(class) = &self.value_class {
            return Some(class.clone());
        }
        match self.def.declared() {
            TypeRef::Param(_) => self
                .def
                .declared()
                .resolve(generics)
                .filter(|c| c.is_final() || (self.fixed_types && !c.is_abstract())),
            TypeRef::Class(_) => None,
        }
    }

    fn type_args(&self, generics: &[Option<Class>]) -> Vec<Option<Class>> {
        self.def
            .declared_type_args()
            .iter()
            .map(|arg| arg.resolve(generics))
            .collect()
    }

    fn trace(&self, object: &ObjectRef) -> String {
        format!("{} ({})", self.def.name(), object.borrow().class().name())
    }

    fn serializer_for(&self, session: &Session<'_>, class: &Class) -> Result<Arc<dyn Serializer>> {
        match &self.serializer {
            Some(serializer) => Ok(Arc::clone(serializer)),
            None => session.serializer(class),
        }
    }

    /// Writes this field of `object`.
    ///
    /// # Errors
    ///
    /// Fails when the field cannot be read or its value cannot be written;
    /// the error trace gains an entry for this field.
    pub fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        object: &ObjectRef,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let value = self.access.get(&object.borrow())?;
        tracing::trace!(field = self.def.name(), owner = %self.owner, "Write field");
        self.write_value(session, output, &value, generics)
            .map_err(|e| e.traced(self.trace(object)))
    }

    fn write_value(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let type_args = self.type_args(generics);
        let Some(class) = self.concrete_class(generics) else {
            let runtime = value.class();
            let Some(registration) = session.write_class(output, runtime.as_ref())? else {
                return Ok(());
            };
            let serializer = match &self.serializer {
                Some(serializer) => Arc::clone(serializer),
                None => Arc::clone(registration.serializer()),
            };
            return session.write_object_with(output, value, serializer.as_ref(), &type_args);
        };
        let serializer = self.serializer_for(session, &class)?;
        if self.can_be_null {
            return session.write_object_or_null_with(output, value, serializer.as_ref(), &type_args);
        }
        if value.is_null() {
            return Err(GraphError::null_value(format!(
                "Field value is null but canBeNull is false: {}",
                self.def.name()
            )));
        }
        session.write_object_with(output, value, serializer.as_ref(), &type_args)
    }

    /// Reads this field into `object`.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be read or stored; the error trace gains
    /// an entry for this field.
    pub fn read(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        object: &ObjectRef,
        generics: &[Option<Class>],
    ) -> Result<()> {
        tracing::trace!(field = self.def.name(), owner = %self.owner, "Read field");
        let value = self
            .read_value(session, input, generics)
            .map_err(|e| e.traced(self.trace(object)))?;
        let stored = self.access.set(&mut object.borrow_mut(), value);
        stored.map_err(|e| e.traced(self.trace(object)))
    }

    fn read_value(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        generics: &[Option<Class>],
    ) -> Result<Value> {
        let type_args = self.type_args(generics);
        let Some(class) = self.concrete_class(generics) else {
            let Some(registration) = session.read_class(input)? else {
                return Ok(Value::Null);
            };
            let serializer = match &self.serializer {
                Some(serializer) => Arc::clone(serializer),
                None => Arc::clone(registration.serializer()),
            };
            return session.read_object_with(input, registration.class(), serializer.as_ref(), &type_args);
        };
        let serializer = self.serializer_for(session, &class)?;
        if self.can_be_null {
            session.read_object_or_null_with(input, &class, serializer.as_ref(), &type_args)
        } else {
            session.read_object_with(input, &class, serializer.as_ref(), &type_args)
        }
    }

    /// Copies this field from `original` into `copy` through the session.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be copied or stored.
    pub fn copy(&self, session: &mut Session<'_>, original: &ObjectRef, copy: &ObjectRef) -> Result<()> {
        self.access
            .copy(original, copy, &mut |value| session.copy(&value))
            .map_err(|e| e.traced(self.trace(original)))
    }
}

impl fmt::Debug for CachedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedField")
            .field("name", &self.def.name())
            .field("owner", &self.owner)
            .field("value_class", &self.value_class.as_ref().map(Class::name))
            .field("can_be_null", &self.can_be_null)
            .field("serializer", &self.serializer.as_ref().map(|s| s.name()))
            .finish()
    }
}

#[derive(Clone)]
struct Fields {
    serialized: Arc<[CachedField]>,
    transient: Arc<[CachedField]>,
}

/// Writes the fields of an object one after another.
///
/// The field set is computed when the serializer is built and can be narrowed
/// afterwards with [`remove_field`](Self::remove_field).
///
/// # Examples
///
/// ```rust
/// use graphwire::model::{Class, FieldDef, PrimitiveKind};
/// use graphwire::serializers::field::{FieldSerializer, FieldSerializerConfig};
///
/// let user = Class::builder("demo.User")
///     .field(FieldDef::new("name", Class::string()))
///     .field(FieldDef::new("age", Class::primitive(PrimitiveKind::Int)))
///     .field(FieldDef::new("session", Class::string()).transient())
///     .build();
///
/// let serializer = FieldSerializer::with_config(&user, FieldSerializerConfig::new().exclude("age"));
/// let names: Vec<String> = serializer.fields().iter().map(|f| f.name().to_string()).collect();
/// assert_eq!(names, ["name"]);
/// ```
pub struct FieldSerializer {
    class: Class,
    config: FieldSerializerConfig,
    fields: RwLock<Fields>,
}

impl FieldSerializer {
    /// Creates a serializer for `class` with the default options.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Self::with_config(class, FieldSerializerConfig::default())
    }

    /// Creates a serializer for `class` with `config`.
    #[must_use]
    pub fn with_config(class: &Class, config: FieldSerializerConfig) -> Self {
        Self::filtered(class, config, |_| true)
    }

    /// Creates a serializer that only considers fields accepted by `filter`.
    pub(crate) fn filtered(
        class: &Class,
        config: FieldSerializerConfig,
        filter: impl Fn(&FieldDef) -> bool,
    ) -> Self {
        let fields = discover(class, &config, filter);
        Self {
            class: class.clone(),
            config,
            fields: RwLock::new(fields),
        }
    }

    /// The class this serializer was built for.
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.class
    }

    /// The options in effect.
    #[must_use]
    pub fn config(&self) -> &FieldSerializerConfig {
        &self.config
    }

    /// The serialized fields, in wire order.
    #[must_use]
    pub fn fields(&self) -> Arc<[CachedField]> {
        Arc::clone(&self.fields.read().serialized)
    }

    /// Transient fields, copied but not serialized.
    #[must_use]
    pub fn transient_fields(&self) -> Arc<[CachedField]> {
        Arc::clone(&self.fields.read().transient)
    }

    /// Stops serializing the field called `name`.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument error when no such field is serialized.
    pub fn remove_field(&self, name: &str) -> Result<()> {
        let mut fields = self.fields.write();
        let before = fields.serialized.len();
        let remaining: Vec<CachedField> = fields
            .serialized
            .iter()
            .filter(|f| f.name() != name)
            .cloned()
            .collect();
        if remaining.len() == before {
            return Err(GraphError::invalid_argument(format!(
                "Field \"{name}\" not found on class: {}",
                self.class
            )));
        }
        tracing::trace!(class = self.class.name(), field = name, "Remove field");
        fields.serialized = remaining.into();
        Ok(())
    }

    /// Creates the instance that a read fills in.
    ///
    /// # Errors
    ///
    /// Fails when the class cannot be instantiated.
    pub fn create(&self, session: &Session<'_>, class: &Class) -> Result<ObjectRef> {
        session.new_instance(class)
    }

    /// Creates the instance that a copy fills in.
    ///
    /// # Errors
    ///
    /// Fails when the class cannot be instantiated.
    pub fn create_copy(&self, session: &Session<'_>, original: &ObjectRef) -> Result<ObjectRef> {
        let class = original.borrow().class().clone();
        session.new_instance(&class)
    }

    pub(crate) fn copy_fields(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        let source = expect_object(original)?;
        let copy = self.create_copy(session, source)?;
        let value = Value::Object(Rc::clone(&copy));
        session.reference(&value);
        let fields = self.fields.read().clone();
        for field in fields.serialized.iter() {
            field.copy(session, source, &copy)?;
        }
        if self.config.copy_transient {
            for field in fields.transient.iter() {
                field.copy(session, source, &copy)?;
            }
        }
        Ok(value)
    }
}

impl Serializer for FieldSerializer {
    fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let object = expect_object(value)?;
        for field in self.fields().iter() {
            field.write(session, output, object, generics)?;
        }
        Ok(())
    }

    fn read(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        class: &Class,
        generics: &[Option<Class>],
    ) -> Result<Value> {
        let object = self.create(session, class)?;
        let value = Value::Object(Rc::clone(&object));
        session.reference(&value);
        for field in self.fields().iter() {
            field.read(session, input, &object, generics)?;
        }
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        self.copy_fields(session, original)
    }

    fn name(&self) -> &'static str {
        "field"
    }
}

impl fmt::Debug for FieldSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSerializer")
            .field("class", &self.class.name())
            .field("fields", &self.fields().len())
            .field("config", &self.config)
            .finish()
    }
}

fn discover(class: &Class, config: &FieldSerializerConfig, filter: impl Fn(&FieldDef) -> bool) -> Fields {
    let mut serialized = Vec::new();
    let mut transient = Vec::new();
    for (index, slot) in class.slots().iter().enumerate() {
        let def = slot.def();
        if def.is_static()
            || (!def.is_public() && !config.fields_as_accessible)
            || config.excluded.iter().any(|name| name == def.name())
            || !filter(def)
        {
            continue;
        }
        let field = CachedField::new(class, index, config);
        if def.is_transient() && !config.serialize_transient {
            transient.push(field);
        } else {
            serialized.push(field);
        }
    }
    serialized.sort_by(|a, b| a.name().cmp(b.name()));
    Fields {
        serialized: serialized.into(),
        transient: transient.into(),
    }
}

pub(crate) fn expect_object(value: &Value) -> Result<&ObjectRef> {
    value.as_object().ok_or_else(|| {
        GraphError::invalid_argument(format!("Expected an object but got {}", value.type_name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::model::PrimitiveKind;

    fn int() -> Class {
        Class::primitive(PrimitiveKind::Int)
    }

    fn person() -> Class {
        Class::builder("demo.Person")
            .field(FieldDef::new("name", Class::string()))
            .field(FieldDef::new("age", int()))
            .field(FieldDef::new("friend", Class::any()))
            .field(FieldDef::new("cache", Class::string()).transient())
            .field(FieldDef::new("secret", Class::string()).private())
            .build()
    }

    fn names(serializer: &FieldSerializer) -> Vec<String> {
        serializer.fields().iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_fields_sorted_and_filtered() {
        let serializer = FieldSerializer::new(&person());
        assert_eq!(names(&serializer), ["age", "friend", "name", "secret"]);
        assert_eq!(serializer.transient_fields().len(), 1);

        let serializer = FieldSerializer::with_config(
            &person(),
            FieldSerializerConfig::new()
                .with_fields_as_accessible(false)
                .with_serialize_transient(true),
        );
        assert_eq!(names(&serializer), ["age", "cache", "friend", "name"]);
    }

    #[test]
    fn test_cached_field_attributes() {
        let serializer = FieldSerializer::new(&person());
        let fields = serializer.fields();
        let age = fields.iter().find(|f| f.name() == "age").unwrap();
        assert!(!age.can_be_null());
        assert_eq!(age.value_class(), Some(&int()));
        let friend = fields.iter().find(|f| f.name() == "friend").unwrap();
        assert!(friend.can_be_null());
        assert!(friend.value_class().is_none());
    }

    #[test]
    fn test_remove_field() {
        let serializer = FieldSerializer::new(&person());
        serializer.remove_field("secret").unwrap();
        assert_eq!(names(&serializer), ["age", "friend", "name"]);
        let err = serializer.remove_field("secret").unwrap_err();
        assert!(matches!(err.kind(), crate::error::ErrorKind::InvalidArgument(_)));
    }

    #[test]
    fn test_round_trip_with_every_access_strategy() {
        for access in [AccessStrategy::Introspective, AccessStrategy::Generated, AccessStrategy::Direct] {
            let class = person();
            let mut engine = Engine::new();
            engine.register_with(
                &class,
                Arc::new(FieldSerializer::with_config(&class, FieldSerializerConfig::new().with_access(access))),
            );
            let value = Value::object(&class);
            {
                let object = value.as_object().unwrap();
                let mut object = object.borrow_mut();
                object.set("name", "ada").unwrap();
                object.set("age", 36).unwrap();
                object.set("friend", Value::Int(7)).unwrap();
                object.set("cache", "skip me").unwrap();
            }
            let bytes = engine.to_bytes(&value).unwrap();
            let back = engine.from_bytes(&bytes).unwrap();
            assert_eq!(back.field("name").unwrap().as_str(), Some("ada"));
            assert_eq!(back.field("age"), Some(Value::Int(36)));
            assert_eq!(back.field("friend"), Some(Value::Int(7)));
            assert!(back.field("cache").unwrap().is_null(), "{access:?}");
        }
    }

    #[test]
    fn test_self_cycle_with_every_access_strategy() {
        for access in [AccessStrategy::Introspective, AccessStrategy::Generated, AccessStrategy::Direct] {
            let class = person();
            let mut engine = Engine::new();
            engine.register_with(
                &class,
                Arc::new(FieldSerializer::with_config(&class, FieldSerializerConfig::new().with_access(access))),
            );
            let value = Value::object(&class);
            {
                let object = value.as_object().unwrap();
                let mut object = object.borrow_mut();
                object.set("name", "loop").unwrap();
                object.set("friend", &value).unwrap();
            }
            let bytes = engine.to_bytes(&value).unwrap();
            let back = engine.from_bytes(&bytes).unwrap();
            assert!(back.field("friend").unwrap().same_instance(&back), "{access:?}");
            assert_eq!(back, value);

            let copy = engine.copy(&value).unwrap();
            assert!(copy.field("friend").unwrap().same_instance(&copy), "{access:?}");
            assert!(!copy.same_instance(&value));
        }
    }

    #[test]
    fn test_introspective_access_rejects_self_of_wrong_class() {
        let class = Class::builder("demo.Wrapper")
            .field(FieldDef::new("label", Class::string()))
            .build();
        let access = IntrospectiveAccess::new("demo.Wrapper", "label");
        let value = Value::object(&class);
        let object = value.as_object().unwrap();
        let err = access.set(&mut object.borrow_mut(), value.clone()).unwrap_err();
        assert!(err.to_string().contains("cannot hold demo.Wrapper"));
    }

    #[test]
    fn test_not_null_field_rejects_null() {
        let class = Class::builder("demo.Strict")
            .field(FieldDef::new("label", Class::string()).not_null())
            .build();
        let mut engine = Engine::new();
        engine.register(&class);
        let err = engine.to_bytes(&Value::object(&class)).unwrap_err();
        assert!(err.is_null_value());
        assert_eq!(err.trace(), &["label (demo.Strict)".to_string()]);
    }

    #[test]
    fn test_copy_is_deep_and_keeps_transient() {
        let class = person();
        let mut engine = Engine::new();
        let inner = Value::object(&class);
        let value = Value::object(&class);
        {
            let object = value.as_object().unwrap();
            let mut object = object.borrow_mut();
            object.set("friend", &inner).unwrap();
            object.set("cache", "kept").unwrap();
        }
        let copy = engine.copy(&value).unwrap();
        assert!(!copy.same_instance(&value));
        assert_eq!(copy, value);
        assert!(!copy.field("friend").unwrap().same_instance(&inner));
        assert_eq!(copy.field("cache").unwrap().as_str(), Some("kept"));

        let shallow = engine.copy_shallow(&value).unwrap();
        assert!(!shallow.same_instance(&value));
        assert!(shallow.field("friend").unwrap().same_instance(&inner));
    }
}
