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

//! Integration tests for reference tracking, class identity and registration.

use graphwire::{Class, Engine, EngineConfig, FieldDef, ReferenceStrategy, Value};

fn node_class() -> Class {
    Class::builder("demo.Node")
        .field(FieldDef::new("label", Class::string()))
        .field(FieldDef::new("next", Class::any()))
        .build()
}

fn list_class() -> Class {
    Class::builder("demo.List").collection().build()
}

fn node(label: &str) -> Value {
    let value = Value::object(&node_class());
    value.as_object().unwrap().borrow_mut().set("label", label).unwrap();
    value
}

fn link(from: &Value, to: &Value) {
    from.as_object().unwrap().borrow_mut().set("next", to).unwrap();
}

fn list_of(values: &[&Value]) -> Value {
    let list = Value::object(&list_class());
    for value in values {
        list.as_object().unwrap().borrow_mut().push(*value).unwrap();
    }
    list
}

fn elements(list: &Value) -> Vec<Value> {
    list.as_object().unwrap().borrow().elements().to_vec()
}

fn engine(config: EngineConfig) -> Engine {
    let mut engine = Engine::with_config(config);
    engine.register(&node_class());
    engine.register(&list_class());
    engine
}

/// Test that a shared object is written once and read back as one instance.
#[test]
fn test_shared_object_written_once() {
    for strategy in [ReferenceStrategy::Map, ReferenceStrategy::List] {
        let mut engine = engine(EngineConfig::new().with_reference_strategy(strategy));
        let shared = node("shared");
        let value = list_of(&[&shared, &shared]);

        let bytes = engine.to_bytes(&value).unwrap();
        assert_eq!(engine.metrics().total_back_references_written(), 1);

        let back = engine.from_bytes(&bytes).unwrap();
        let items = elements(&back);
        assert!(items[0].same_instance(&items[1]), "{strategy:?}");
        assert_eq!(engine.metrics().total_back_references_resolved(), 1);
    }
}

/// Test that a cycle survives the round trip.
#[test]
fn test_cycle_round_trip() {
    let mut engine = engine(EngineConfig::new());
    let a = node("a");
    let b = node("b");
    link(&a, &b);
    link(&b, &a);

    let bytes = engine.to_bytes(&a).unwrap();
    let back = engine.from_bytes(&bytes).unwrap();
    let next = back.field("next").unwrap();
    assert_eq!(next.field("label").unwrap().as_str(), Some("b"));
    assert!(next.field("next").unwrap().same_instance(&back));
}

/// Test that a self reference resolves to the enclosing object.
#[test]
fn test_self_reference() {
    let mut engine = engine(EngineConfig::new());
    let a = node("self");
    link(&a, &a);
    let bytes = engine.to_bytes(&a).unwrap();
    let back = engine.from_bytes(&bytes).unwrap();
    assert!(back.field("next").unwrap().same_instance(&back));
}

/// Test that without references shared objects are duplicated.
#[test]
fn test_references_disabled_duplicates() {
    let mut engine = engine(EngineConfig::new().with_references(false));
    let shared = node("shared");
    let value = list_of(&[&shared, &shared]);

    let with_references = {
        let mut tracked = self::engine(EngineConfig::new());
        tracked.to_bytes(&value).unwrap()
    };
    let bytes = engine.to_bytes(&value).unwrap();
    assert_ne!(bytes, with_references);

    let back = engine.from_bytes(&bytes).unwrap();
    let items = elements(&back);
    assert!(!items[0].same_instance(&items[1]));
    assert_eq!(items[0], items[1]);
}

/// Test that a cycle without references hits the depth limit instead of recursing forever.
#[test]
fn test_cycle_without_references_exceeds_depth() {
    let mut engine = engine(EngineConfig::new().with_references(false).with_max_depth(64));
    let a = node("a");
    link(&a, &a);
    let err = engine.to_bytes(&a).unwrap_err();
    assert!(err.is_depth_exceeded());
    assert!(err.trace().iter().any(|entry| entry == "next (demo.Node)"));
}

/// Test that a deep but acyclic chain fits under a generous depth limit.
#[test]
fn test_deep_chain_within_depth() {
    let mut engine = engine(EngineConfig::new().with_max_depth(1024));
    let head = node("0");
    let mut tail = head.clone();
    for i in 1..100 {
        let next = node(&i.to_string());
        link(&tail, &next);
        tail = next;
    }
    let bytes = engine.to_bytes(&head).unwrap();
    assert_eq!(engine.from_bytes(&bytes).unwrap(), head);
}

/// Test the exact bytes of a registered root and of null.
#[test]
fn test_root_bytes() {
    let mut engine = Engine::new();
    assert_eq!(engine.to_bytes(&Value::Int(5)).unwrap(), vec![2, 10]);
    assert_eq!(engine.to_bytes(&Value::Null).unwrap(), vec![0]);
    assert_eq!(engine.to_bytes(&Value::Bool(true)).unwrap(), vec![5, 1]);
    assert!(engine.from_bytes(&[0]).unwrap().is_null());
}

/// Test that an unregistered class is written by name once per session.
#[test]
fn test_class_name_written_once_per_session() {
    let leaf = Class::builder("demo.Leaf").build();
    let mut writer = Engine::new();
    writer.register(&list_class());
    let value = list_of(&[&Value::object(&leaf), &Value::object(&leaf)]);

    let bytes = writer.to_bytes(&value).unwrap();
    let name = b"demo.Leaf";
    let occurrences = bytes.windows(name.len()).filter(|w| *w == &name[..]).count();
    assert_eq!(occurrences, 1);

    // A fresh session writes the name again.
    let again = writer.to_bytes(&value).unwrap();
    assert_eq!(again, bytes);

    let mut reader = Engine::new();
    reader.register(&list_class());
    reader.define(&leaf);
    let back = reader.from_bytes(&bytes).unwrap();
    assert_eq!(back, value);
}

/// Test that a reader that cannot resolve a class name fails cleanly.
#[test]
fn test_unknown_class_name() {
    let leaf = Class::builder("demo.Leaf").build();
    let mut writer = Engine::new();
    let bytes = writer.to_bytes(&Value::object(&leaf)).unwrap();

    let mut reader = Engine::new();
    let err = reader.from_bytes(&bytes).unwrap_err();
    assert!(err.is_unregistered_class());
    assert_eq!(reader.metrics().total_errors(), 1);
}

/// Test that required registration rejects implicit classes on write.
#[test]
fn test_registration_required() {
    let mut engine = Engine::with_config(EngineConfig::new().with_registration_required(true));
    let err = engine.to_bytes(&node("x")).unwrap_err();
    assert!(err.is_unregistered_class());
    assert!(err.to_string().contains("Class is not registered: demo.Node"));

    engine.register(&node_class());
    let bytes = engine.to_bytes(&node("x")).unwrap();
    assert_eq!(engine.from_bytes(&bytes).unwrap(), node("x"));
}

/// Test that both sides agree on explicit ids regardless of registration order.
#[test]
fn test_explicit_ids() {
    let a = Class::builder("demo.A").build();
    let b = Class::builder("demo.B").build();

    let mut writer = Engine::new();
    writer.register_with_id(&a, None, 40).unwrap();
    writer.register_with_id(&b, None, 41).unwrap();
    let mut reader = Engine::new();
    reader.register_with_id(&b, None, 41).unwrap();
    reader.register_with_id(&a, None, 40).unwrap();

    let bytes = writer.to_bytes(&Value::object(&b)).unwrap();
    assert_eq!(bytes[0], 43);
    let back = reader.from_bytes(&bytes).unwrap();
    assert_eq!(back.class(), Some(b));
}

/// Test that an unknown id is reported as an unregistered class.
#[test]
fn test_unknown_class_id() {
    let mut engine = Engine::new();
    let err = engine.from_bytes(&[100, 1]).unwrap_err();
    assert!(err.is_unregistered_class());
}

/// Test that a reference to an id never read is rejected.
#[test]
fn test_dangling_back_reference() {
    let mut engine = engine(EngineConfig::new());
    let class_id = engine.registration(&node_class()).unwrap().id();
    let graphwire::resolver::RegistrationId::Id(id) = class_id else {
        panic!("expected a numeric id");
    };
    let err = engine.from_bytes(&[(id + 2) as u8, 7]).unwrap_err();
    assert!(err.to_string().contains("Invalid reference id"));
}

/// Test that primitive values are never reference tracked.
#[test]
fn test_boxed_values_are_not_tracked() {
    let mut engine = engine(EngineConfig::new());
    let value = list_of(&[&Value::Long(9), &Value::Long(9)]);
    engine.to_bytes(&value).unwrap();
    assert_eq!(engine.metrics().total_back_references_written(), 0);
}
