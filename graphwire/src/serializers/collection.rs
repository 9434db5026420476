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

//! Serializer for collection classes.

use super::element::{element_trace, read_size, write_size, ElementCodec};
use super::field::expect_object;
use super::Serializer;
use crate::engine::Session;
use crate::error::Result;
use crate::io::{Input, Output};
use crate::model::{Class, ObjectRef, Value};
use std::fmt;
use std::rc::Rc;

/// Writes `varint(size + 1)` followed by the elements.
///
/// With an element class (configured, or a final class bound to the first
/// type parameter) every element shares one serializer and no per-element
/// class identity is written. Otherwise each element carries its class.
#[derive(Clone, Default)]
pub struct CollectionSerializer {
    element_class: Option<Class>,
    elements_can_be_null: bool,
}

impl CollectionSerializer {
    /// Creates a serializer with per-element classes and nullable elements.
    #[must_use]
    pub fn new() -> Self {
        Self {
            element_class: None,
            elements_can_be_null: true,
        }
    }

    /// Uses `class` for every element.
    #[must_use]
    pub fn with_element_class(mut self, class: &Class) -> Self {
        self.element_class = Some(class.clone());
        self
    }

    /// Sets whether elements may be null. Saves a marker per element when
    /// false and the element class is known.
    #[must_use]
    pub fn with_elements_can_be_null(mut self, can_be_null: bool) -> Self {
        self.elements_can_be_null = can_be_null;
        self
    }

    fn codec(&self, session: &Session<'_>, generics: &[Option<Class>]) -> Result<ElementCodec> {
        let hint = generics.first().and_then(Option::as_ref);
        ElementCodec::resolve(session, self.element_class.as_ref(), hint, self.elements_can_be_null)
    }

    /// Writes `elements` without a size header.
    ///
    /// # Errors
    ///
    /// Fails when an element cannot be written; the trace names its index.
    pub fn write_elements(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        container: &Class,
        elements: &[Value],
        generics: &[Option<Class>],
    ) -> Result<()> {
        let codec = self.codec(session, generics)?;
        for (index, element) in elements.iter().enumerate() {
            codec
                .write(session, output, element)
                .map_err(|e| e.traced(element_trace(index, container)))?;
        }
        Ok(())
    }

    /// Reads `count` elements and appends them to `collection`.
    ///
    /// # Errors
    ///
    /// Fails when an element cannot be read; the trace names its index.
    pub fn read_elements_into(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        collection: &ObjectRef,
        count: usize,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let codec = self.codec(session, generics)?;
        let container = collection.borrow().class().clone();
        for index in 0..count {
            let element = codec
                .read(session, input)
                .map_err(|e| e.traced(element_trace(index, &container)))?;
            collection.borrow_mut().push(element)?;
        }
        Ok(())
    }
}

impl Serializer for CollectionSerializer {
    fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()> {
        if value.is_null() {
            output.write_varint(0, true)?;
            return Ok(());
        }
        let object = expect_object(value)?;
        let (class, elements) = {
            let object = object.borrow();
            (object.class().clone(), object.elements().to_vec())
        };
        write_size(output, elements.len())?;
        self.write_elements(session, output, &class, &elements, generics)
    }

    fn read(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        class: &Class,
        generics: &[Option<Class>],
    ) -> Result<Value> {
        let Some(count) = read_size(input)? else {
            return Ok(Value::Null);
        };
        let collection = session.new_instance(class)?;
        let value = Value::Object(Rc::clone(&collection));
        session.reference(&value);
        self.read_elements_into(session, input, &collection, count, generics)?;
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        let source = expect_object(original)?;
        let (class, elements) = {
            let source = source.borrow();
            (source.class().clone(), source.elements().to_vec())
        };
        let copy = session.new_instance(&class)?;
        let value = Value::Object(Rc::clone(&copy));
        session.reference(&value);
        for element in &elements {
            let element = session.copy(element)?;
            copy.borrow_mut().push(element)?;
        }
        Ok(value)
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "collection"
    }
}

impl fmt::Debug for CollectionSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionSerializer")
            .field("element_class", &self.element_class.as_ref().map(Class::name))
            .field("elements_can_be_null", &self.elements_can_be_null)
            .finish()
    }
}
