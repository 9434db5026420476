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

//! Class descriptors.
//!
//! A [`Class`] is the runtime type of a value. Classes are immutable once
//! built and cheap to clone; two handles are equal when their names are.

use super::value::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// The eight primitive value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `bool`
    Bool,
    /// signed 8-bit
    Byte,
    /// UTF-16 code unit
    Char,
    /// signed 16-bit
    Short,
    /// signed 32-bit
    Int,
    /// signed 64-bit
    Long,
    /// 32-bit IEEE-754
    Float,
    /// 64-bit IEEE-754
    Double,
}

impl PrimitiveKind {
    /// All kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Name of the primitive class.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Name of the boxed class.
    #[must_use]
    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "Bool",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::Short => "Short",
            PrimitiveKind::Int => "Int",
            PrimitiveKind::Long => "Long",
            PrimitiveKind::Float => "Float",
            PrimitiveKind::Double => "Double",
        }
    }

    /// The default value of a slot of this kind.
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            PrimitiveKind::Bool => Value::Bool(false),
            PrimitiveKind::Byte => Value::Byte(0),
            PrimitiveKind::Char => Value::Char(0),
            PrimitiveKind::Short => Value::Short(0),
            PrimitiveKind::Int => Value::Int(0),
            PrimitiveKind::Long => Value::Long(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// What a class is, structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassKind {
    /// A primitive; values are never null and never reference tracked.
    Primitive(PrimitiveKind),
    /// The nullable boxed form of a primitive.
    Boxed(PrimitiveKind),
    /// Immutable text.
    String,
    /// A plain object with named fields.
    Object,
    /// An ordered collection of elements (may also declare fields).
    Collection,
    /// A map of key/value entries (may also declare fields).
    Map,
    /// A fixed-length array of the component class.
    Array(Class),
}

/// A constant used as a field's initial value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    /// bool constant
    Bool(bool),
    /// byte constant
    Byte(i8),
    /// char constant
    Char(u16),
    /// short constant
    Short(i16),
    /// int constant
    Int(i32),
    /// long constant
    Long(i64),
    /// float constant
    Float(f32),
    /// double constant
    Double(f64),
    /// string constant
    Str(String),
}

impl Literal {
    /// Converts the constant into a fresh value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Bool(v) => Value::Bool(*v),
            Literal::Byte(v) => Value::Byte(*v),
            Literal::Char(v) => Value::Char(*v),
            Literal::Short(v) => Value::Short(*v),
            Literal::Int(v) => Value::Int(*v),
            Literal::Long(v) => Value::Long(*v),
            Literal::Float(v) => Value::Float(*v),
            Literal::Double(v) => Value::Double(*v),
            Literal::Str(v) => Value::string(v.as_str()),
        }
    }
}

/// A declared type: a concrete class or a type parameter of the enclosing class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A concrete class.
    Class(Class),
    /// The n-th type parameter of the declaring class.
    Param(usize),
}

impl TypeRef {
    /// Resolves the declared type against the generics of the current call.
    #[must_use]
    pub fn resolve(&self, scope: &[Option<Class>]) -> Option<Class> {
        match self {
            TypeRef::Class(class) => Some(class.clone()),
            TypeRef::Param(index) => scope.get(*index).cloned().flatten(),
        }
    }
}

impl From<Class> for TypeRef {
    fn from(class: Class) -> Self {
        TypeRef::Class(class)
    }
}

impl From<&Class> for TypeRef {
    fn from(class: &Class) -> Self {
        TypeRef::Class(class.clone())
    }
}

/// Declaration of one field.
///
/// # Examples
///
/// ```rust
/// use graphwire::model::{Class, FieldDef, Literal, PrimitiveKind};
///
/// let moo = FieldDef::new("moo", Class::primitive(PrimitiveKind::Int))
///     .initial(Literal::Int(120))
///     .tag(3);
/// assert_eq!(moo.name(), "moo");
/// assert_eq!(moo.tag_value(), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    name: String,
    declared: TypeRef,
    type_args: Vec<TypeRef>,
    is_static: bool,
    is_transient: bool,
    is_public: bool,
    not_null: bool,
    tag: Option<u32>,
    deprecated: bool,
    initial: Option<Literal>,
}

impl FieldDef {
    /// Declares a public instance field.
    pub fn new(name: impl Into<String>, declared: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            declared: declared.into(),
            type_args: Vec::new(),
            is_static: false,
            is_transient: false,
            is_public: true,
            not_null: false,
            tag: None,
            deprecated: false,
            initial: None,
        }
    }

    /// Sets the type arguments of the declared type, e.g. the element type of a list.
    #[must_use]
    pub fn type_args(mut self, args: Vec<TypeRef>) -> Self {
        self.type_args = args;
        self
    }

    /// Marks the field static; static fields are never serialized.
    #[must_use]
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Marks the field transient.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.is_transient = true;
        self
    }

    /// Marks the field non-public.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Declares that the field never holds null.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Assigns a stable tag for tag-keyed serialization.
    #[must_use]
    pub fn tag(mut self, tag: u32) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Marks a tagged field as deprecated: still read, no longer written.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Sets the value a constructor assigns to the field.
    #[must_use]
    pub fn initial(mut self, value: Literal) -> Self {
        self.initial = Some(value);
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    #[must_use]
    pub fn declared(&self) -> &TypeRef {
        &self.declared
    }

    /// Type arguments of the declared type.
    #[must_use]
    pub fn declared_type_args(&self) -> &[TypeRef] {
        &self.type_args
    }

    /// Whether the field is static.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether the field is transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    /// Whether the field is public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.is_public
    }

    /// Whether the field was declared never-null.
    #[must_use]
    pub fn is_not_null(&self) -> bool {
        self.not_null
    }

    /// The tag, if any.
    #[must_use]
    pub fn tag_value(&self) -> Option<u32> {
        self.tag
    }

    /// Whether the field is deprecated.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// The constructor-assigned initial value, if any.
    #[must_use]
    pub fn initial_value(&self) -> Option<&Literal> {
        self.initial.as_ref()
    }

    /// Zero value of a slot holding this field.
    pub(crate) fn zero(&self) -> Value {
        match &self.declared {
            TypeRef::Class(class) => match class.kind() {
                ClassKind::Primitive(kind) => kind.zero(),
                _ => Value::Null,
            },
            TypeRef::Param(_) => Value::Null,
        }
    }
}

/// One instance-field slot of an object, superclass slots first.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    owner: String,
    def: FieldDef,
}

impl Slot {
    /// Name of the class that declares the field.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The field declaration.
    #[must_use]
    pub fn def(&self) -> &FieldDef {
        &self.def
    }
}

/// Immutable class description behind a [`Class`] handle.
#[derive(Debug)]
pub struct ClassInfo {
    name: String,
    kind: ClassKind,
    superclass: Option<Class>,
    fields: Vec<FieldDef>,
    slots: Vec<Slot>,
    type_params: usize,
    is_final: bool,
    is_abstract: bool,
}

/// Handle to a class description.
///
/// # Examples
///
/// ```rust
/// use graphwire::model::{Class, FieldDef, PrimitiveKind};
///
/// let base = Class::builder("demo.Shape")
///     .field(FieldDef::new("id", Class::primitive(PrimitiveKind::Int)))
///     .build();
/// let circle = Class::builder("demo.Circle")
///     .superclass(&base)
///     .field(FieldDef::new("radius", Class::primitive(PrimitiveKind::Double)))
///     .final_class()
///     .build();
///
/// assert!(base.is_assignable_from(&circle));
/// assert_eq!(circle.slots().len(), 2);
/// assert_eq!(circle.slots()[0].def().name(), "id");
/// ```
#[derive(Clone)]
pub struct Class(Arc<ClassInfo>);

impl Class {
    /// Starts building a plain object class.
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name.into())
    }

    /// The primitive class of `kind`.
    #[must_use]
    pub fn primitive(kind: PrimitiveKind) -> Class {
        static PRIMITIVES: OnceLock<Vec<Class>> = OnceLock::new();
        PRIMITIVES.get_or_init(|| {
            PrimitiveKind::ALL
                .iter()
                .map(|&k| builtin(k.name(), ClassKind::Primitive(k)))
                .collect()
        })[kind.index()]
        .clone()
    }

    /// The boxed class of `kind`.
    #[must_use]
    pub fn boxed(kind: PrimitiveKind) -> Class {
        static BOXED: OnceLock<Vec<Class>> = OnceLock::new();
        BOXED.get_or_init(|| {
            PrimitiveKind::ALL
                .iter()
                .map(|&k| builtin(k.boxed_name(), ClassKind::Boxed(k)))
                .collect()
        })[kind.index()]
        .clone()
    }

    /// The string class.
    #[must_use]
    pub fn string() -> Class {
        static STRING: OnceLock<Class> = OnceLock::new();
        STRING
            .get_or_init(|| builtin("string", ClassKind::String))
            .clone()
    }

    /// The root class every class is assignable to. Used as the declared
    /// type of fully polymorphic fields.
    #[must_use]
    pub fn any() -> Class {
        static ANY: OnceLock<Class> = OnceLock::new();
        ANY.get_or_init(|| {
            Class(Arc::new(ClassInfo {
                name: "any".to_string(),
                kind: ClassKind::Object,
                superclass: None,
                fields: Vec::new(),
                slots: Vec::new(),
                type_params: 0,
                is_final: false,
                is_abstract: true,
            }))
        })
        .clone()
    }

    /// The array class with the given component.
    #[must_use]
    pub fn array_of(component: &Class) -> Class {
        Class(Arc::new(ClassInfo {
            name: format!("{}[]", component.name()),
            kind: ClassKind::Array(component.clone()),
            superclass: None,
            fields: Vec::new(),
            slots: Vec::new(),
            type_params: 0,
            is_final: component.is_final(),
            is_abstract: false,
        }))
    }

    /// Fully qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Structural kind.
    #[must_use]
    pub fn kind(&self) -> &ClassKind {
        &self.0.kind
    }

    /// Direct superclass.
    #[must_use]
    pub fn superclass(&self) -> Option<&Class> {
        self.0.superclass.as_ref()
    }

    /// Fields declared on this class only.
    #[must_use]
    pub fn declared_fields(&self) -> &[FieldDef] {
        &self.0.fields
    }

    /// Instance slots across the whole superclass chain, superclass first.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.0.slots
    }

    /// Index of the slot declared by `owner` with the given name.
    #[must_use]
    pub fn slot_index(&self, owner: &str, name: &str) -> Option<usize> {
        self.0
            .slots
            .iter()
            .position(|s| s.owner == owner && s.def.name == name)
    }

    /// Index of the most derived slot with the given name.
    #[must_use]
    pub fn slot_named(&self, name: &str) -> Option<usize> {
        self.0.slots.iter().rposition(|s| s.def.name == name)
    }

    /// Number of generic type parameters.
    #[must_use]
    pub fn type_params(&self) -> usize {
        self.0.type_params
    }

    /// Whether no subclass can exist, so the runtime class of a value
    /// declared with this class is known statically.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.0.is_final
    }

    /// Whether instances cannot be created.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract
    }

    /// Whether this is a primitive class.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self.0.kind, ClassKind::Primitive(_))
    }

    /// The primitive kind of a primitive or boxed class.
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.0.kind {
            ClassKind::Primitive(kind) | ClassKind::Boxed(kind) => Some(kind),
            _ => None,
        }
    }

    /// The component class of an array class.
    #[must_use]
    pub fn component(&self) -> Option<&Class> {
        match &self.0.kind {
            ClassKind::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Returns `true` when a value of class `other` may be stored where this
    /// class is declared.
    #[must_use]
    pub fn is_assignable_from(&self, other: &Class) -> bool {
        if self.name() == "any" {
            return true;
        }
        if let (Some(a), Some(b)) = (self.primitive_kind(), other.primitive_kind()) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (self.component(), other.component()) {
            return a.is_assignable_from(b);
        }
        let mut current = Some(other);
        while let Some(class) = current {
            if class == self {
                return true;
            }
            current = class.superclass();
        }
        false
    }

    /// Returns `true` when `value` may be stored where this class is declared.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        self.accepts_class(value.class().as_ref())
    }

    /// Returns `true` when a value of runtime class `class`, or null for
    /// `None`, may be stored where this class is declared.
    #[must_use]
    pub fn accepts_class(&self, class: Option<&Class>) -> bool {
        match class {
            None => !self.is_primitive(),
            Some(class) => self.is_assignable_from(class),
        }
    }
}

fn builtin(name: &str, kind: ClassKind) -> Class {
    Class(Arc::new(ClassInfo {
        name: name.to_string(),
        kind,
        superclass: None,
        fields: Vec::new(),
        slots: Vec::new(),
        type_params: 0,
        is_final: true,
        is_abstract: false,
    }))
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.0.name)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// Builder for user classes.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    superclass: Option<Class>,
    fields: Vec<FieldDef>,
    type_params: usize,
    is_final: bool,
    is_abstract: bool,
}

impl ClassBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            kind: ClassKind::Object,
            superclass: None,
            fields: Vec::new(),
            type_params: 0,
            is_final: false,
            is_abstract: false,
        }
    }

    /// Makes the class a collection with one type parameter (the element).
    #[must_use]
    pub fn collection(mut self) -> Self {
        self.kind = ClassKind::Collection;
        self.type_params = self.type_params.max(1);
        self
    }

    /// Makes the class a map with two type parameters (key, value).
    #[must_use]
    pub fn map(mut self) -> Self {
        self.kind = ClassKind::Map;
        self.type_params = self.type_params.max(2);
        self
    }

    /// Sets the superclass. A collection or map superclass is inherited as the kind.
    #[must_use]
    pub fn superclass(mut self, superclass: &Class) -> Self {
        if matches!(superclass.kind(), ClassKind::Collection | ClassKind::Map) {
            self.kind = superclass.kind().clone();
        }
        self.superclass = Some(superclass.clone());
        self
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the number of generic type parameters.
    #[must_use]
    pub fn type_params(mut self, count: usize) -> Self {
        self.type_params = count;
        self
    }

    /// Marks the class final.
    #[must_use]
    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Marks the class abstract.
    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Builds the class, laying out instance slots superclass first.
    #[must_use]
    pub fn build(self) -> Class {
        let mut slots = self
            .superclass
            .as_ref()
            .map(|s| s.slots().to_vec())
            .unwrap_or_default();
        slots.extend(
            self.fields
                .iter()
                .filter(|f| !f.is_static)
                .map(|f| Slot {
                    owner: self.name.clone(),
                    def: f.clone(),
                }),
        );
        Class(Arc::new(ClassInfo {
            name: self.name,
            kind: self.kind,
            superclass: self.superclass,
            fields: self.fields,
            slots,
            type_params: self.type_params,
            is_final: self.is_final,
            is_abstract: self.is_abstract,
        }))
    }
}
