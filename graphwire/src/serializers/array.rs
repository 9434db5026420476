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

//! Serializers for object and primitive arrays.

use super::element::{element_trace, read_size, write_size, ElementCodec};
use super::field::expect_object;
use super::Serializer;
use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, Object, ObjectRef, PrimitiveKind, Value};
use std::rc::Rc;

fn component_of(class: &Class) -> Result<&Class> {
    class
        .component()
        .ok_or_else(|| GraphError::invalid_argument(format!("Not an array class: {}", class.name())))
}

fn set_element(array: &ObjectRef, index: usize, value: Value) -> Result<()> {
    let mut array = array.borrow_mut();
    let class = array.class().name().to_string();
    let slot = array
        .elements_mut()
        .and_then(|elements| elements.get_mut(index))
        .ok_or_else(|| GraphError::invalid_argument(format!("Index {index} out of bounds for {class}")))?;
    *slot = value;
    Ok(())
}

fn push_element(array: &ObjectRef, value: Value) -> Result<()> {
    let mut array = array.borrow_mut();
    let class = array.class().name().to_string();
    array
        .elements_mut()
        .ok_or_else(|| GraphError::invalid_argument(format!("Not an array class: {class}")))?
        .push(value);
    Ok(())
}

fn array_parts(value: &Value) -> Result<(Class, Vec<Value>)> {
    let object = expect_object(value)?;
    let object = object.borrow();
    Ok((object.class().clone(), object.elements().to_vec()))
}

/// Serializer for arrays of objects, strings and boxed primitives.
///
/// When the component class is final, or every element is declared to share
/// it, elements skip the per-element class identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectArraySerializer {
    elements_are_same_type: bool,
    elements_can_be_null: bool,
}

impl Default for ObjectArraySerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectArraySerializer {
    /// Creates a serializer for heterogeneous, nullable elements.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements_are_same_type: false,
            elements_can_be_null: true,
        }
    }

    /// Declares that every element has exactly the component class.
    #[must_use]
    pub fn with_elements_are_same_type(mut self, same_type: bool) -> Self {
        self.elements_are_same_type = same_type;
        self
    }

    /// Sets whether elements may be null.
    #[must_use]
    pub fn with_elements_can_be_null(mut self, can_be_null: bool) -> Self {
        self.elements_can_be_null = can_be_null;
        self
    }

    fn codec(&self, session: &Session<'_>, class: &Class) -> Result<ElementCodec> {
        let component = component_of(class)?;
        let configured = (self.elements_are_same_type || component.is_final()).then_some(component);
        ElementCodec::resolve(session, configured, None, self.elements_can_be_null)
    }
}

impl Serializer for ObjectArraySerializer {
    fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        _generics: &[Option<Class>],
    ) -> Result<()> {
        if value.is_null() {
            output.write_varint(0, true)?;
            return Ok(());
        }
        let (class, elements) = array_parts(value)?;
        write_size(output, elements.len())?;
        let codec = self.codec(session, &class)?;
        for (index, element) in elements.iter().enumerate() {
            codec
                .write(session, output, element)
                .map_err(|e| e.traced(element_trace(index, &class)))?;
        }
        Ok(())
    }

    fn read(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        class: &Class,
        _generics: &[Option<Class>],
    ) -> Result<Value> {
        let Some(len) = read_size(input)? else {
            return Ok(Value::Null);
        };
        let codec = self.codec(session, class)?;
        let mut object = Object::new_array(class, 0);
        if let Some(elements) = object.elements_mut() {
            elements.reserve(len.min(input.remaining().max(16)));
        }
        let value = Value::from_object(object);
        let array = Rc::clone(expect_object(&value)?);
        session.reference(&value);
        for index in 0..len {
            let element = codec
                .read(session, input)
                .map_err(|e| e.traced(element_trace(index, class)))?;
            push_element(&array, element)?;
        }
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        let (class, elements) = array_parts(original)?;
        let value = Value::from_object(Object::new_array(&class, elements.len()));
        let array = Rc::clone(expect_object(&value)?);
        session.reference(&value);
        for (index, element) in elements.iter().enumerate() {
            let element = session.copy(element)?;
            set_element(&array, index, element)?;
        }
        Ok(value)
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "object-array"
    }
}

/// Serializer for arrays of one primitive kind, written through the buffer's
/// bulk paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveArraySerializer {
    kind: PrimitiveKind,
}

impl PrimitiveArraySerializer {
    /// Creates a serializer for arrays of `kind`.
    #[must_use]
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }

    /// The element kind.
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    fn unpack<T>(&self, elements: &[Value], extract: impl Fn(&Value) -> Option<T>) -> Result<Vec<T>> {
        elements
            .iter()
            .map(|element| {
                extract(element).ok_or_else(|| {
                    GraphError::invalid_argument(format!(
                        "Expected {} but got {}",
                        self.kind.name(),
                        element.type_name()
                    ))
                })
            })
            .collect()
    }

    fn write_elements(&self, output: &mut Output<'_>, elements: &[Value]) -> Result<()> {
        match self.kind {
            PrimitiveKind::Bool => {
                let values = self.unpack(elements, |v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })?;
                output.write_bools(&values)
            }
            PrimitiveKind::Byte => {
                let values = self.unpack(elements, |v| match v {
                    Value::Byte(b) => Some(b.to_be_bytes()[0]),
                    _ => None,
                })?;
                output.write_bytes(&values)
            }
            PrimitiveKind::Char => {
                let values = self.unpack(elements, |v| match v {
                    Value::Char(c) => Some(*c),
                    _ => None,
                })?;
                output.write_chars(&values)
            }
            PrimitiveKind::Short => {
                let values = self.unpack(elements, |v| match v {
                    Value::Short(s) => Some(*s),
                    _ => None,
                })?;
                output.write_i16s(&values)
            }
            PrimitiveKind::Int => {
                let values = self.unpack(elements, Value::as_int)?;
                output.write_i32s(&values, false)
            }
            PrimitiveKind::Long => {
                let values = self.unpack(elements, Value::as_long)?;
                output.write_i64s(&values, false)
            }
            PrimitiveKind::Float => {
                let values = self.unpack(elements, |v| match v {
                    Value::Float(f) => Some(*f),
                    _ => None,
                })?;
                output.write_f32s(&values)
            }
            PrimitiveKind::Double => {
                let values = self.unpack(elements, |v| match v {
                    Value::Double(d) => Some(*d),
                    _ => None,
                })?;
                output.write_f64s(&values)
            }
        }
    }

    fn read_elements(&self, input: &mut Input<'_>, len: usize) -> Result<Vec<Value>> {
        Ok(match self.kind {
            PrimitiveKind::Bool => input.read_bools(len)?.into_iter().map(Value::Bool).collect(),
            PrimitiveKind::Byte => input
                .read_bytes(len)?
                .into_iter()
                .map(|b| Value::Byte(i8::from_be_bytes([b])))
                .collect(),
            PrimitiveKind::Char => input.read_chars(len)?.into_iter().map(Value::Char).collect(),
            PrimitiveKind::Short => input.read_i16s(len)?.into_iter().map(Value::Short).collect(),
            PrimitiveKind::Int => input.read_i32s(len, false)?.into_iter().map(Value::Int).collect(),
            PrimitiveKind::Long => input.read_i64s(len, false)?.into_iter().map(Value::Long).collect(),
            PrimitiveKind::Float => input.read_f32s(len)?.into_iter().map(Value::Float).collect(),
            PrimitiveKind::Double => input.read_f64s(len)?.into_iter().map(Value::Double).collect(),
        })
    }
}

impl Serializer for PrimitiveArraySerializer {
    fn write(
        &self,
        _session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        _generics: &[Option<Class>],
    ) -> Result<()> {
        if value.is_null() {
            output.write_varint(0, true)?;
            return Ok(());
        }
        let (_, elements) = array_parts(value)?;
        write_size(output, elements.len())?;
        self.write_elements(output, &elements)
    }

    fn read(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        class: &Class,
        _generics: &[Option<Class>],
    ) -> Result<Value> {
        let Some(len) = read_size(input)? else {
            return Ok(Value::Null);
        };
        let elements = self.read_elements(input, len)?;
        let mut array = Object::new_array(class, 0);
        if let Some(slots) = array.elements_mut() {
            *slots = elements;
        }
        let value = Value::from_object(array);
        session.reference(&value);
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        let (class, elements) = array_parts(original)?;
        let mut array = Object::new_array(&class, 0);
        if let Some(slots) = array.elements_mut() {
            *slots = elements;
        }
        let value = Value::from_object(array);
        session.reference(&value);
        Ok(value)
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        match self.kind {
            PrimitiveKind::Bool => "bool[]",
            PrimitiveKind::Byte => "byte[]",
            PrimitiveKind::Char => "char[]",
            PrimitiveKind::Short => "short[]",
            PrimitiveKind::Int => "int[]",
            PrimitiveKind::Long => "long[]",
            PrimitiveKind::Float => "float[]",
            PrimitiveKind::Double => "double[]",
        }
    }
}
