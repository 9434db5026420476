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

//! Integration tests for schema evolution with the compatible and tagged
//! field serializers.

use graphwire::engine::{CompatibleFieldSerializerFactory, TaggedFieldSerializerFactory};
use graphwire::{Class, Engine, FieldDef, Literal, PrimitiveKind, Value};

fn int() -> Class {
    Class::primitive(PrimitiveKind::Int)
}

fn list_class() -> Class {
    Class::builder("demo.List").collection().build()
}

fn detail_class() -> Class {
    Class::builder("demo.Detail")
        .field(FieldDef::new("note", Class::string()))
        .field(FieldDef::new("values", list_class()))
        .build()
}

fn record_v1() -> Class {
    Class::builder("demo.Record")
        .field(FieldDef::new("a", int()))
        .field(FieldDef::new("b", Class::string()))
        .field(FieldDef::new("c", int()))
        .field(FieldDef::new("extra", Class::any()))
        .build()
}

fn record_v2() -> Class {
    Class::builder("demo.Record")
        .field(FieldDef::new("a", int()))
        .field(FieldDef::new("b", Class::string()))
        .field(FieldDef::new("d", int()).initial(Literal::Int(99)))
        .build()
}

fn compatible_engine(record: &Class) -> Engine {
    let mut engine = Engine::new();
    engine.set_default_serializer(CompatibleFieldSerializerFactory::default());
    engine.register(&list_class());
    engine.register(&detail_class());
    engine.register(record);
    engine
}

fn record(class: &Class, a: i32, b: &str) -> Value {
    let value = Value::object(class);
    {
        let object = value.as_object().unwrap();
        let mut object = object.borrow_mut();
        object.set("a", a).unwrap();
        object.set("b", b).unwrap();
    }
    value
}

fn detail(note: &str) -> Value {
    let values = Value::object(&list_class());
    for n in 0..10 {
        values.as_object().unwrap().borrow_mut().push(n).unwrap();
    }
    let value = Value::object(&detail_class());
    {
        let object = value.as_object().unwrap();
        let mut object = object.borrow_mut();
        object.set("note", note).unwrap();
        object.set("values", values).unwrap();
    }
    value
}

/// Test that a reader drops removed fields and keeps defaults for added ones.
#[test]
fn test_compatible_added_and_removed_fields() {
    let old = record_v1();
    let mut writer = compatible_engine(&old);
    let value = record(&old, 7, "seven");
    {
        let object = value.as_object().unwrap();
        let mut object = object.borrow_mut();
        object.set("c", 3).unwrap();
        object.set("extra", detail("skipped")).unwrap();
    }
    let bytes = writer.to_bytes(&value).unwrap();

    let new = record_v2();
    let mut reader = compatible_engine(&new);
    let back = reader.from_bytes(&bytes).unwrap();
    assert_eq!(back.class(), Some(new));
    assert_eq!(back.field("a"), Some(Value::Int(7)));
    assert_eq!(back.field("b").unwrap().as_str(), Some("seven"));
    assert_eq!(back.field("d"), Some(Value::Int(99)));
}

/// Test that many records share one header and all decode after evolution.
#[test]
fn test_compatible_records_in_collection() {
    let old = record_v1();
    let mut writer = compatible_engine(&old);
    let list = Value::object(&list_class());
    for i in 0..5 {
        let item = record(&old, i, &format!("r{i}"));
        item.as_object().unwrap().borrow_mut().set("extra", detail("x")).unwrap();
        list.as_object().unwrap().borrow_mut().push(item).unwrap();
    }
    let bytes = writer.to_bytes(&list).unwrap();
    let header = b"extra";
    assert_eq!(bytes.windows(header.len()).filter(|w| *w == &header[..]).count(), 1);

    let new = record_v2();
    let mut reader = compatible_engine(&new);
    let back = reader.from_bytes(&bytes).unwrap();
    let items = back.as_object().unwrap().borrow().elements().to_vec();
    assert_eq!(items.len(), 5);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.field("a"), Some(Value::Int(i as i32)));
        assert_eq!(item.field("b").unwrap().as_str(), Some(format!("r{i}").as_str()));
        assert_eq!(item.field("d"), Some(Value::Int(99)));
    }
}

/// Test that the same class on both sides round-trips exactly.
#[test]
fn test_compatible_same_layout() {
    let class = record_v1();
    let mut engine = compatible_engine(&class);
    let value = record(&class, -1, "same");
    value.as_object().unwrap().borrow_mut().set("extra", detail("kept")).unwrap();
    let bytes = engine.to_bytes(&value).unwrap();
    assert_eq!(engine.from_bytes(&bytes).unwrap(), value);
}

fn person(fields: Vec<FieldDef>) -> Class {
    fields
        .into_iter()
        .fold(Class::builder("demo.Person"), |builder, field| builder.field(field))
        .build()
}

fn person_v1() -> Class {
    person(vec![
        FieldDef::new("name", Class::string()).tag(1),
        FieldDef::new("age", int()).tag(2),
        FieldDef::new("nickname", Class::string()).tag(3).deprecated(),
        FieldDef::new("scratch", Class::string()),
    ])
}

fn person_v2() -> Class {
    person(vec![
        FieldDef::new("name", Class::string()).tag(1),
        FieldDef::new("age", int()).tag(2),
        FieldDef::new("email", Class::string()).tag(4),
    ])
}

fn tagged_engine(class: &Class) -> Engine {
    let mut engine = Engine::new();
    engine.set_default_serializer(TaggedFieldSerializerFactory::default());
    engine.register(class);
    engine
}

/// Test that tagged fields survive an added tag and a deprecated tag.
#[test]
fn test_tagged_evolution() {
    let old = person_v1();
    let mut writer = tagged_engine(&old);
    let value = Value::object(&old);
    {
        let object = value.as_object().unwrap();
        let mut object = object.borrow_mut();
        object.set("name", "ada").unwrap();
        object.set("age", 36).unwrap();
        object.set("nickname", "countess").unwrap();
        object.set("scratch", "untagged").unwrap();
    }
    let bytes = writer.to_bytes(&value).unwrap();
    assert!(!bytes.windows(8).any(|w| w == b"countess"));
    assert!(!bytes.windows(8).any(|w| w == b"untagged"));

    let new = person_v2();
    let mut reader = tagged_engine(&new);
    let back = reader.from_bytes(&bytes).unwrap();
    assert_eq!(back.field("name").unwrap().as_str(), Some("ada"));
    assert_eq!(back.field("age"), Some(Value::Int(36)));
    assert!(back.field("email").unwrap().is_null());
}

/// Test that a tag the reader does not know fails with an unknown-tag error.
#[test]
fn test_tagged_unknown_tag() {
    let newer = person_v2();
    let mut writer = tagged_engine(&newer);
    let value = Value::object(&newer);
    value.as_object().unwrap().borrow_mut().set("email", "a@b.c").unwrap();
    let bytes = writer.to_bytes(&value).unwrap();

    let older = person_v1();
    let mut reader = tagged_engine(&older);
    let err = reader.from_bytes(&bytes).unwrap_err();
    assert!(err.is_unknown_tag());
    assert!(err.to_string().starts_with("Unknown field tag: 4 (demo.Person)"));
}
