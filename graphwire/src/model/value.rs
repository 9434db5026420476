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

//! Dynamic values.
//!
//! Graphs are built from [`Value`]s. Objects live behind `Rc<RefCell<_>>`, so
//! a graph can share and cycle; two values are the *same object* when their
//! `Rc` pointers are equal. `==` on values compares structure and tolerates
//! cycles.

use super::class::{Class, ClassKind, PrimitiveKind};
use crate::error::{GraphError, Result};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::rc::Rc;

/// Shared, mutable object handle.
pub type ObjectRef = Rc<RefCell<Object>>;

/// A value in an object graph.
#[derive(Clone, Default)]
pub enum Value {
    /// The null reference.
    #[default]
    Null,
    /// bool
    Bool(bool),
    /// byte
    Byte(i8),
    /// char (UTF-16 code unit)
    Char(u16),
    /// short
    Short(i16),
    /// int
    Int(i32),
    /// long
    Long(i64),
    /// float
    Float(f32),
    /// double
    Double(f64),
    /// Shared immutable text; identity is the `Rc` pointer.
    Str(Rc<str>),
    /// An object, collection, map or array.
    Object(ObjectRef),
}

/// Non-field content of an object.
#[derive(Debug, Clone, Default)]
pub enum Content {
    /// Plain object.
    #[default]
    Empty,
    /// Collection or array elements.
    Elements(Vec<Value>),
    /// Map entries in insertion order.
    Entries(Vec<(Value, Value)>),
}

/// An instance of a [`Class`].
#[derive(Debug, Clone)]
pub struct Object {
    class: Class,
    slots: Vec<Value>,
    content: Content,
}

impl Object {
    /// Creates an instance with every slot at its zero value.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        let content = match class.kind() {
            ClassKind::Collection | ClassKind::Array(_) => Content::Elements(Vec::new()),
            ClassKind::Map => Content::Entries(Vec::new()),
            _ => Content::Empty,
        };
        Self {
            class: class.clone(),
            slots: class.slots().iter().map(|s| s.def().zero()).collect(),
            content,
        }
    }

    /// Creates an array instance of `len` zero or null elements.
    #[must_use]
    pub fn new_array(class: &Class, len: usize) -> Self {
        let zero = match class.component().map(Class::kind) {
            Some(ClassKind::Primitive(kind)) => kind.zero(),
            _ => Value::Null,
        };
        Self {
            class: class.clone(),
            slots: Vec::new(),
            content: Content::Elements(vec![zero; len]),
        }
    }

    /// The runtime class.
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.class
    }

    /// All slots, superclass slots first.
    #[must_use]
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// The value in slot `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    /// Replaces the value in slot `index`.
    pub fn set_slot(&mut self, index: usize, value: Value) -> Result<()> {
        let class = self.class.name().to_string();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            GraphError::access(format!("#{index}"), format!("{class} has no such slot"))
        })?;
        *slot = value;
        Ok(())
    }

    /// The value of the most derived field called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.class.slot_named(name).and_then(|i| self.slots.get(i))
    }

    /// Sets the most derived field called `name`, checking the declared type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let index = self.class.slot_named(name).ok_or_else(|| {
            GraphError::access(name, format!("{} declares no such field", self.class))
        })?;
        if let Some(declared) = declared_class(&self.class, index) {
            let runtime = value.class_in(self);
            if !declared.accepts_class(runtime.as_ref()) {
                return Err(GraphError::access(
                    name,
                    format!("{} cannot hold {}", declared, type_name_of(runtime.as_ref())),
                ));
            }
        }
        self.slots[index] = value;
        Ok(())
    }

    /// Collection or array elements; empty for other kinds.
    #[must_use]
    pub fn elements(&self) -> &[Value] {
        match &self.content {
            Content::Elements(elements) => elements,
            _ => &[],
        }
    }

    /// Mutable elements of a collection or array.
    pub fn elements_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.content {
            Content::Elements(elements) => Some(elements),
            _ => None,
        }
    }

    /// Appends an element to a collection.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<()> {
        let class = self.class.name().to_string();
        self.elements_mut()
            .ok_or_else(|| GraphError::invalid_argument(format!("{class} has no elements")))?
            .push(value.into());
        Ok(())
    }

    /// Map entries; empty for other kinds.
    #[must_use]
    pub fn entries(&self) -> &[(Value, Value)] {
        match &self.content {
            Content::Entries(entries) => entries,
            _ => &[],
        }
    }

    /// Mutable map entries.
    pub fn entries_mut(&mut self) -> Option<&mut Vec<(Value, Value)>> {
        match &mut self.content {
            Content::Entries(entries) => Some(entries),
            _ => None,
        }
    }

    /// Inserts or replaces the entry whose key equals `key`.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let class = self.class.name().to_string();
        let entries = self
            .entries_mut()
            .ok_or_else(|| GraphError::invalid_argument(format!("{class} has no entries")))?;
        let (key, value) = (key.into(), value.into());
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
        Ok(())
    }

    /// Looks up the value whose key equals `key`.
    #[must_use]
    pub fn lookup(&self, key: &Value) -> Option<&Value> {
        self.entries().iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of elements or entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.content {
            Content::Elements(elements) => elements.len(),
            Content::Entries(entries) => entries.len(),
            Content::Empty => 0,
        }
    }

    /// Whether there are no elements or entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn type_name_of(class: Option<&Class>) -> String {
    class.map_or_else(|| "null".to_string(), |c| c.name().to_string())
}

fn declared_class(class: &Class, index: usize) -> Option<Class> {
    match class.slots().get(index)?.def().declared() {
        super::TypeRef::Class(declared) => Some(declared.clone()),
        super::TypeRef::Param(_) => None,
    }
}

impl Value {
    /// Creates a new zero-initialized object of `class`.
    #[must_use]
    pub fn object(class: &Class) -> Value {
        Value::Object(Rc::new(RefCell::new(Object::new(class))))
    }

    /// Wraps an object.
    #[must_use]
    pub fn from_object(object: Object) -> Value {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    /// Creates a new string value.
    #[must_use]
    pub fn string(text: &str) -> Value {
        Value::Str(Rc::from(text))
    }

    /// Whether this is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime class; `None` for null. Primitive values report their boxed class.
    #[must_use]
    pub fn class(&self) -> Option<Class> {
        let boxed = |kind| Some(Class::boxed(kind));
        match self {
            Value::Null => None,
            Value::Bool(_) => boxed(PrimitiveKind::Bool),
            Value::Byte(_) => boxed(PrimitiveKind::Byte),
            Value::Char(_) => boxed(PrimitiveKind::Char),
            Value::Short(_) => boxed(PrimitiveKind::Short),
            Value::Int(_) => boxed(PrimitiveKind::Int),
            Value::Long(_) => boxed(PrimitiveKind::Long),
            Value::Float(_) => boxed(PrimitiveKind::Float),
            Value::Double(_) => boxed(PrimitiveKind::Double),
            Value::Str(_) => Some(Class::string()),
            Value::Object(object) => Some(object.borrow().class.clone()),
        }
    }

    /// The runtime class of a value about to be stored into `holder`.
    ///
    /// `holder` is usually mutably borrowed at this point and the value may be
    /// `holder` itself, so its class is taken from `holder` instead of the cell.
    #[must_use]
    pub fn class_in(&self, holder: &Object) -> Option<Class> {
        match self {
            Value::Object(object) if std::ptr::eq(object.as_ptr().cast_const(), holder) => {
                Some(holder.class.clone())
            }
            _ => self.class(),
        }
    }

    /// Name of the runtime class, or `"null"`.
    #[must_use]
    pub fn type_name(&self) -> String {
        type_name_of(self.class().as_ref())
    }

    /// The object handle, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The text, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    /// The int, if this is an int.
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The long, if this is a long.
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads the named field of an object value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.as_object()
            .and_then(|o| o.borrow().get(name).cloned())
    }

    /// Pointer identity of a shared value; `None` for null and primitives.
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Str(text) => Some(Rc::as_ptr(text).cast::<u8>() as usize),
            Value::Object(object) => Some(Rc::as_ptr(object) as usize),
            _ => None,
        }
    }

    /// Whether both values are the same shared instance.
    #[must_use]
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn deep_eq(&self, other: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let key = (Rc::as_ptr(a) as usize, Rc::as_ptr(b) as usize);
                if !seen.insert(key) {
                    return true;
                }
                let (Ok(a), Ok(b)) = (a.try_borrow(), b.try_borrow()) else {
                    return false;
                };
                a.class == b.class
                    && a.slots.len() == b.slots.len()
                    && a
                        .slots
                        .iter()
                        .zip(&b.slots)
                        .all(|(x, y)| x.deep_eq(y, seen))
                    && match (&a.content, &b.content) {
                        (Content::Empty, Content::Empty) => true,
                        (Content::Elements(x), Content::Elements(y)) => {
                            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| p.deep_eq(q, seen))
                        }
                        (Content::Entries(x), Content::Entries(y)) => {
                            x.len() == y.len()
                                && x.iter().zip(y).all(|((k1, v1), (k2, v2))| {
                                    k1.deep_eq(k2, seen) && v1.deep_eq(v2, seen)
                                })
                        }
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    fn describe(&self, out: &mut String, visiting: &mut HashSet<usize>) -> fmt::Result {
        match self {
            Value::Null => out.write_str("null"),
            Value::Bool(v) => write!(out, "{v}"),
            Value::Byte(v) => write!(out, "{v}b"),
            Value::Char(v) => write!(out, "'\\u{{{v:04x}}}'"),
            Value::Short(v) => write!(out, "{v}s"),
            Value::Int(v) => write!(out, "{v}"),
            Value::Long(v) => write!(out, "{v}L"),
            Value::Float(v) => write!(out, "{v}f"),
            Value::Double(v) => write!(out, "{v}d"),
            Value::Str(v) => write!(out, "{v:?}"),
            Value::Object(object) => {
                let id = Rc::as_ptr(object) as usize;
                let Ok(object) = object.try_borrow() else {
                    return out.write_str("<borrowed>");
                };
                if !visiting.insert(id) {
                    return write!(out, "<cycle {}>", object.class);
                }
                write!(out, "{}", object.class)?;
                if !object.slots.is_empty() {
                    out.write_str(" {")?;
                    for (i, (slot, value)) in object.class.slots().iter().zip(&object.slots).enumerate() {
                        if i > 0 {
                            out.write_str(",")?;
                        }
                        write!(out, " {}: ", slot.def().name())?;
                        value.describe(out, visiting)?;
                    }
                    out.write_str(" }")?;
                }
                match &object.content {
                    Content::Empty => {}
                    Content::Elements(elements) => {
                        out.write_str(" [")?;
                        for (i, element) in elements.iter().enumerate() {
                            if i > 0 {
                                out.write_str(", ")?;
                            }
                            element.describe(out, visiting)?;
                        }
                        out.write_str("]")?;
                    }
                    Content::Entries(entries) => {
                        out.write_str(" {")?;
                        for (i, (key, value)) in entries.iter().enumerate() {
                            if i > 0 {
                                out.write_str(", ")?;
                            }
                            key.describe(out, visiting)?;
                            out.write_str(": ")?;
                            value.describe(out, visiting)?;
                        }
                        out.write_str("}")?;
                    }
                }
                visiting.remove(&id);
                Ok(())
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other, &mut HashSet::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.describe(&mut out, &mut HashSet::new())?;
        f.write_str(&out)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    ObjectRef => Object,
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::string(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Str(Rc::from(text))
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl From<&ObjectRef> for Value {
    fn from(object: &ObjectRef) -> Self {
        Value::Object(Rc::clone(object))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
