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

//! Serializers for primitives, their boxed forms and strings.

use super::Serializer;
use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, PrimitiveKind, Value};
use std::rc::Rc;

/// Serializer for one primitive kind and its boxed class.
///
/// Int and long use zig-zag varints (or fixed width when the buffer kind
/// disables varints); everything else is fixed width, big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveSerializer {
    kind: PrimitiveKind,
}

impl PrimitiveSerializer {
    /// Creates a serializer for `kind`.
    #[must_use]
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }

    /// The primitive kind this serializer handles.
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    fn mismatch(&self, value: &Value) -> GraphError {
        GraphError::invalid_argument(format!(
            "Expected {} but got {}",
            self.kind.name(),
            value.type_name()
        ))
    }
}

impl Serializer for PrimitiveSerializer {
    fn write(
        &self,
        _session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        _generics: &[Option<Class>],
    ) -> Result<()> {
        match (self.kind, value) {
            (PrimitiveKind::Bool, Value::Bool(v)) => output.write_bool(*v),
            (PrimitiveKind::Byte, Value::Byte(v)) => output.write_i8(*v),
            (PrimitiveKind::Char, Value::Char(v)) => output.write_char(*v),
            (PrimitiveKind::Short, Value::Short(v)) => output.write_i16(*v),
            (PrimitiveKind::Int, Value::Int(v)) => output.write_int(*v, false),
            (PrimitiveKind::Long, Value::Long(v)) => output.write_long(*v, false),
            (PrimitiveKind::Float, Value::Float(v)) => output.write_f32(*v),
            (PrimitiveKind::Double, Value::Double(v)) => output.write_f64(*v),
            _ => Err(self.mismatch(value)),
        }
    }

    fn read(
        &self,
        _session: &mut Session<'_>,
        input: &mut Input<'_>,
        _class: &Class,
        _generics: &[Option<Class>],
    ) -> Result<Value> {
        Ok(match self.kind {
            PrimitiveKind::Bool => Value::Bool(input.read_bool()?),
            PrimitiveKind::Byte => Value::Byte(input.read_i8()?),
            PrimitiveKind::Char => Value::Char(input.read_char()?),
            PrimitiveKind::Short => Value::Short(input.read_i16()?),
            PrimitiveKind::Int => Value::Int(input.read_int(false)?),
            PrimitiveKind::Long => Value::Long(input.read_long(false)?),
            PrimitiveKind::Float => Value::Float(input.read_f32()?),
            PrimitiveKind::Double => Value::Double(input.read_f64()?),
        })
    }

    fn is_immutable(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Serializer for strings. Writes its own null marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringSerializer;

impl Serializer for StringSerializer {
    fn write(
        &self,
        _session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        _generics: &[Option<Class>],
    ) -> Result<()> {
        match value {
            Value::Null => output.write_string(None),
            Value::Str(text) => output.write_string(Some(text)),
            other => Err(GraphError::invalid_argument(format!(
                "Expected string but got {}",
                other.type_name()
            ))),
        }
    }

    fn read(
        &self,
        _session: &mut Session<'_>,
        input: &mut Input<'_>,
        _class: &Class,
        _generics: &[Option<Class>],
    ) -> Result<Value> {
        Ok(input
            .read_string()?
            .map_or(Value::Null, |text| Value::Str(Rc::from(text))))
    }

    fn accepts_null(&self) -> bool {
        true
    }

    fn is_immutable(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "string"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn write(engine: &mut Engine, value: &Value, serializer: &dyn Serializer) -> Result<Vec<u8>> {
        let mut output = Output::new(16, None);
        engine.write_object_or_null_with(&mut output, value, serializer)?;
        Ok(output.into_bytes())
    }

    #[test]
    fn test_int_uses_zigzag_varint() {
        let mut engine = Engine::new();
        let serializer = PrimitiveSerializer::new(PrimitiveKind::Int);
        let mut output = Output::new(16, None);
        engine.write_object_with(&mut output, &Value::Int(-1), &serializer).unwrap();
        assert_eq!(output.as_bytes(), &[1]);

        let mut output = Output::new(16, None);
        engine.write_object_with(&mut output, &Value::Int(64), &serializer).unwrap();
        assert_eq!(output.position(), 2);
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut engine = Engine::new();
        let mut output = Output::new(16, None);
        let error = engine
            .write_object_with(&mut output, &Value::Long(1), &PrimitiveSerializer::new(PrimitiveKind::Int))
            .unwrap_err();
        assert!(error.to_string().contains("Expected int"));
    }

    #[test]
    fn test_every_kind_round_trips() {
        let mut engine = Engine::new();
        let values = [
            Value::Bool(true),
            Value::Byte(-7),
            Value::Char(0x263a),
            Value::Short(-300),
            Value::Int(i32::MIN),
            Value::Long(i64::MAX),
            Value::Float(1.5),
            Value::Double(-0.25),
        ];
        for (kind, value) in PrimitiveKind::ALL.into_iter().zip(values) {
            let serializer = PrimitiveSerializer::new(kind);
            let mut output = Output::new(16, None);
            engine.write_object_with(&mut output, &value, &serializer).unwrap();
            let mut input = Input::new(output.into_bytes());
            let back = engine
                .read_object_with(&mut input, &Class::primitive(kind), &serializer)
                .unwrap();
            assert_eq!(back, value, "{}", kind.name());
        }
    }

    #[test]
    fn test_string_null_is_one_byte() {
        let mut engine = Engine::new();
        let bytes = write(&mut engine, &Value::Null, &StringSerializer).unwrap();
        assert_eq!(bytes, vec![0]);
        let mut input = Input::new(bytes);
        let back = engine
            .read_object_or_null_with(&mut input, &Class::string(), &StringSerializer)
            .unwrap();
        assert!(back.is_null());
    }

    #[test]
    fn test_string_round_trip() {
        let mut engine = Engine::new();
        let bytes = write(&mut engine, &Value::string("héllo"), &StringSerializer).unwrap();
        let mut input = Input::new(bytes);
        let back = engine
            .read_object_or_null_with(&mut input, &Class::string(), &StringSerializer)
            .unwrap();
        assert_eq!(back.as_str(), Some("héllo"));
    }
}
