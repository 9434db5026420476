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

//! Serializer for map classes.

use super::element::{element_trace, read_size, write_size, ElementCodec};
use super::field::expect_object;
use super::Serializer;
use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, ObjectRef, Value};
use std::fmt;
use std::rc::Rc;

/// Writes `varint(size + 1)` followed by key, value pairs in insertion order.
///
/// Keys and values each use a shared serializer when their class is
/// configured or bound to a final class through the type parameters.
#[derive(Clone, Default)]
pub struct MapSerializer {
    key_class: Option<Class>,
    value_class: Option<Class>,
    keys_can_be_null: bool,
    values_can_be_null: bool,
}

impl MapSerializer {
    /// Creates a serializer with per-entry classes and nullable keys and values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key_class: None,
            value_class: None,
            keys_can_be_null: true,
            values_can_be_null: true,
        }
    }

    /// Uses `class` for every key.
    #[must_use]
    pub fn with_key_class(mut self, class: &Class) -> Self {
        self.key_class = Some(class.clone());
        self
    }

    /// Uses `class` for every value.
    #[must_use]
    pub fn with_value_class(mut self, class: &Class) -> Self {
        self.value_class = Some(class.clone());
        self
    }

    /// Sets whether keys may be null.
    #[must_use]
    pub fn with_keys_can_be_null(mut self, can_be_null: bool) -> Self {
        self.keys_can_be_null = can_be_null;
        self
    }

    /// Sets whether values may be null.
    #[must_use]
    pub fn with_values_can_be_null(mut self, can_be_null: bool) -> Self {
        self.values_can_be_null = can_be_null;
        self
    }

    fn codecs(&self, session: &Session<'_>, generics: &[Option<Class>]) -> Result<(ElementCodec, ElementCodec)> {
        let hint = |index: usize| generics.get(index).and_then(Option::as_ref);
        let keys = ElementCodec::resolve(session, self.key_class.as_ref(), hint(0), self.keys_can_be_null)?;
        let values = ElementCodec::resolve(session, self.value_class.as_ref(), hint(1), self.values_can_be_null)?;
        Ok((keys, values))
    }

    /// Writes `entries` without a size header.
    ///
    /// # Errors
    ///
    /// Fails when a key or value cannot be written; the trace names the entry.
    pub fn write_entries(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        container: &Class,
        entries: &[(Value, Value)],
        generics: &[Option<Class>],
    ) -> Result<()> {
        let (keys, values) = self.codecs(session, generics)?;
        for (index, (key, value)) in entries.iter().enumerate() {
            keys.write(session, output, key)
                .and_then(|()| values.write(session, output, value))
                .map_err(|e| e.traced(element_trace(index, container)))?;
        }
        Ok(())
    }

    /// Reads `count` entries and appends them to `map`.
    ///
    /// # Errors
    ///
    /// Fails when a key or value cannot be read; the trace names the entry.
    pub fn read_entries_into(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        map: &ObjectRef,
        count: usize,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let (keys, values) = self.codecs(session, generics)?;
        let container = map.borrow().class().clone();
        for index in 0..count {
            let entry = keys
                .read(session, input)
                .and_then(|key| Ok((key, values.read(session, input)?)))
                .map_err(|e| e.traced(element_trace(index, &container)))?;
            push_entry(map, entry)?;
        }
        Ok(())
    }
}

fn push_entry(map: &ObjectRef, entry: (Value, Value)) -> Result<()> {
    let mut map = map.borrow_mut();
    let class = map.class().name().to_string();
    map.entries_mut()
        .ok_or_else(|| GraphError::invalid_argument(format!("{class} has no entries")))?
        .push(entry);
    Ok(())
}

impl Serializer for MapSerializer {
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
        let (class, entries) = {
            let object = object.borrow();
            (object.class().clone(), object.entries().to_vec())
        };
        write_size(output, entries.len())?;
        self.write_entries(session, output, &class, &entries, generics)
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
        let map = session.new_instance(class)?;
        let value = Value::Object(Rc::clone(&map));
        session.reference(&value);
        self.read_entries_into(session, input, &map, count, generics)?;
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        let source = expect_object(original)?;
        let (class, entries) = {
            let source = source.borrow();
            (source.class().clone(), source.entries().to_vec())
        };
        let map = session.new_instance(&class)?;
        let value = Value::Object(Rc::clone(&map));
        session.reference(&value);
        for (key, entry) in &entries {
            let key = session.copy(key)?;
            let entry = session.copy(entry)?;
            push_entry(&map, (key, entry))?;
        }
        Ok(value)
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

impl fmt::Debug for MapSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapSerializer")
            .field("key_class", &self.key_class.as_ref().map(Class::name))
            .field("value_class", &self.value_class.as_ref().map(Class::name))
            .field("keys_can_be_null", &self.keys_can_be_null)
            .field("values_can_be_null", &self.values_can_be_null)
            .finish()
    }
}
