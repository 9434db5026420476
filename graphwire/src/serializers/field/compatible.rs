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

//! Name-keyed field evolution.
//!
//! The first object of a class written in a session is preceded by the names
//! of the serialized fields; every field value is then wrapped in chunks:
//!
//! ```text
//! header := varint(count) string(name) x count     -- once per session
//! object := (chunks(value) varint(0)) x count
//! ```
//!
//! A reader maps the header names onto its own fields. Values of fields it no
//! longer has are skipped chunk by chunk, and fields missing from the header
//! keep the value the instantiator gave them.

use super::{expect_object, CachedField, FieldSerializer, FieldSerializerConfig};
use crate::engine::Session;
use crate::error::Result;
use crate::io::{Input, InputChunked, Output, OutputChunked, DEFAULT_CHUNK_SIZE};
use crate::model::{Class, Value};
use crate::serializers::Serializer;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Marker stored in the graph context once the header has been written.
struct HeaderWritten;

/// Header of the stream being read, resolved against the local fields.
struct ReadLayout(Rc<[Option<CachedField>]>);

/// Field serializer that tolerates added and removed fields.
///
/// Costs one header per class per session, and chunk framing per field.
pub struct CompatibleFieldSerializer {
    inner: FieldSerializer,
}

impl CompatibleFieldSerializer {
    /// Creates a serializer for `class` with the default options.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Self::with_config(class, FieldSerializerConfig::default())
    }

    /// Creates a serializer for `class` with `config`.
    #[must_use]
    pub fn with_config(class: &Class, config: FieldSerializerConfig) -> Self {
        Self {
            inner: FieldSerializer::with_config(class, config),
        }
    }

    /// The serialized fields, in header order.
    #[must_use]
    pub fn fields(&self) -> Arc<[CachedField]> {
        self.inner.fields()
    }

    /// Stops serializing the field called `name`.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument error when no such field is serialized.
    pub fn remove_field(&self, name: &str) -> Result<()> {
        self.inner.remove_field(name)
    }

    fn read_layout(&self, session: &mut Session<'_>, input: &mut Input<'_>) -> Result<Rc<[Option<CachedField>]>> {
        if let Some(ReadLayout(layout)) = session.graph_context().get::<ReadLayout, _>(self) {
            return Ok(Rc::clone(layout));
        }
        let count = input.read_length()?;
        let fields = self.inner.fields();
        let mut layout = Vec::with_capacity(count.min(input.remaining().max(16)));
        for _ in 0..count {
            let name = input.read_string()?.unwrap_or_default();
            let field = fields.iter().find(|f| f.name() == name).cloned();
            if field.is_none() {
                tracing::trace!(class = self.inner.class().name(), field = %name, "Ignore obsolete field");
            }
            layout.push(field);
        }
        let layout: Rc<[Option<CachedField>]> = layout.into();
        session
            .graph_context()
            .insert(self, ReadLayout(Rc::clone(&layout)));
        Ok(layout)
    }
}

impl Serializer for CompatibleFieldSerializer {
    fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let object = expect_object(value)?;
        let fields = self.inner.fields();
        if !session.graph_context().contains(self) {
            session.graph_context().insert(self, HeaderWritten);
            tracing::trace!(class = self.inner.class().name(), fields = fields.len(), "Write field names");
            output.write_varint(fields.len() as i32, true)?;
            for field in fields.iter() {
                output.write_string(Some(field.name()))?;
            }
        }
        let mut chunked = OutputChunked::new(output, DEFAULT_CHUNK_SIZE);
        for field in fields.iter() {
            field.write(session, &mut chunked, object, generics)?;
            chunked.end_chunks()?;
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
        let object = self.inner.create(session, class)?;
        let value = Value::Object(Rc::clone(&object));
        session.reference(&value);
        let layout = self.read_layout(session, input)?;
        let mut chunked = InputChunked::new(input);
        for field in layout.iter() {
            if let Some(field) = field {
                field.read(session, chunked.chunk()?, &object, generics)?;
            }
            chunked.next_chunks()?;
        }
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        self.inner.copy_fields(session, original)
    }

    fn name(&self) -> &'static str {
        "compatible-field"
    }
}

impl fmt::Debug for CompatibleFieldSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatibleFieldSerializer")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::model::{FieldDef, Literal, PrimitiveKind};

    fn int() -> Class {
        Class::primitive(PrimitiveKind::Int)
    }

    fn version_one() -> Class {
        Class::builder("demo.Config")
            .field(FieldDef::new("a", int()))
            .field(FieldDef::new("b", Class::string()))
            .field(FieldDef::new("c", int()))
            .build()
    }

    fn version_two() -> Class {
        Class::builder("demo.Config")
            .field(FieldDef::new("a", int()))
            .field(FieldDef::new("b", Class::string()))
            .field(FieldDef::new("d", int()).initial(Literal::Int(99)))
            .build()
    }

    fn engine_for(class: &Class) -> Engine {
        let mut engine = Engine::new();
        engine.register_with(class, Arc::new(CompatibleFieldSerializer::new(class)));
        engine
    }

    #[test]
    fn test_header_written_once_per_session() {
        let class = version_one();
        let mut engine = engine_for(&class);
        let list = Class::builder("demo.ConfigList").collection().build();
        let value = Value::object(&list);
        {
            let object = value.as_object().unwrap();
            let mut object = object.borrow_mut();
            object.push(Value::object(&class)).unwrap();
            object.push(Value::object(&class)).unwrap();
        }
        let bytes = engine.to_bytes(&value).unwrap();
        let name_c = bytes.windows(2).filter(|w| *w == [2, b'c']).count();
        assert_eq!(name_c, 1);
        assert_eq!(engine.from_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn test_removed_and_added_fields() {
        let old = version_one();
        let mut writer = engine_for(&old);
        let value = Value::object(&old);
        {
            let object = value.as_object().unwrap();
            let mut object = object.borrow_mut();
            object.set("a", 1).unwrap();
            object.set("b", "two").unwrap();
            object.set("c", 3).unwrap();
        }
        let bytes = writer.to_bytes(&value).unwrap();

        let new = version_two();
        let mut reader = engine_for(&new);
        let back = reader.from_bytes(&bytes).unwrap();
        assert_eq!(back.field("a"), Some(Value::Int(1)));
        assert_eq!(back.field("b").unwrap().as_str(), Some("two"));
        assert_eq!(back.field("d"), Some(Value::Int(99)));
    }
}
