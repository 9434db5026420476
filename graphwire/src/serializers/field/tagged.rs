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

//! Tag-keyed field evolution.
//!
//! Only tagged fields are serialized. Each value is preceded by its tag:
//!
//! ```text
//! object := varint(count) (varint(tag) value) x count
//! ```
//!
//! Deprecated fields are still read so old data stays loadable, but are never
//! written again. A tag with no matching field is an error.

use super::{expect_object, CachedField, FieldSerializer, FieldSerializerConfig};
use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, Value};
use crate::serializers::Serializer;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Field serializer keyed by stable field tags.
pub struct TaggedFieldSerializer {
    inner: FieldSerializer,
}

impl TaggedFieldSerializer {
    /// Creates a serializer for `class` with the default options.
    #[must_use]
    pub fn new(class: &Class) -> Self {
        Self::with_config(class, FieldSerializerConfig::default())
    }

    /// Creates a serializer for `class` with `config`.
    #[must_use]
    pub fn with_config(class: &Class, config: FieldSerializerConfig) -> Self {
        Self {
            inner: FieldSerializer::filtered(class, config, |def| def.tag_value().is_some()),
        }
    }

    /// The tagged fields, deprecated ones included.
    #[must_use]
    pub fn fields(&self) -> Arc<[CachedField]> {
        self.inner.fields()
    }

    /// Stops handling the field called `name`.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-argument error when no such field is tagged.
    pub fn remove_field(&self, name: &str) -> Result<()> {
        self.inner.remove_field(name)
    }

    fn tagged(&self) -> Vec<(u32, CachedField)> {
        let mut tagged: Vec<(u32, CachedField)> = self
            .inner
            .fields()
            .iter()
            .filter_map(|f| f.def().tag_value().map(|tag| (tag, f.clone())))
            .collect();
        tagged.sort_by_key(|(tag, _)| *tag);
        tagged
    }
}

impl Serializer for TaggedFieldSerializer {
    fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()> {
        let object = expect_object(value)?;
        let live: Vec<(u32, CachedField)> = self
            .tagged()
            .into_iter()
            .filter(|(_, f)| !f.def().is_deprecated())
            .collect();
        output.write_varint(live.len() as i32, true)?;
        for (tag, field) in &live {
            output.write_varint(*tag as i32, true)?;
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
        let object = self.inner.create(session, class)?;
        let value = Value::Object(Rc::clone(&object));
        session.reference(&value);
        let tagged = self.tagged();
        let count = input.read_length()?;
        for _ in 0..count {
            let tag = input.read_length()? as u32;
            let (_, field) = tagged
                .iter()
                .find(|(t, _)| *t == tag)
                .ok_or_else(|| GraphError::unknown_tag(tag, class.name()))?;
            field.read(session, input, &object, generics)?;
        }
        Ok(value)
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        self.inner.copy_fields(session, original)
    }

    fn name(&self) -> &'static str {
        "tagged-field"
    }
}

impl fmt::Debug for TaggedFieldSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedFieldSerializer")
            .field("inner", &self.inner)
            .finish()
    }
}
