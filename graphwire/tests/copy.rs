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

//! Integration tests for deep and shallow graph copies.

use graphwire::serializers::Serializer;
use graphwire::{Class, Engine, EngineConfig, FieldDef, Input, Output, Session, Value};
use std::sync::Arc;

fn node_class() -> Class {
    Class::builder("demo.Node")
        .field(FieldDef::new("label", Class::string()))
        .field(FieldDef::new("left", Class::any()))
        .field(FieldDef::new("right", Class::any()))
        .build()
}

fn node(label: &str) -> Value {
    let value = Value::object(&node_class());
    value.as_object().unwrap().borrow_mut().set("label", label).unwrap();
    value
}

fn set(node: &Value, field: &str, value: &Value) {
    node.as_object().unwrap().borrow_mut().set(field, value).unwrap();
}

/// Builds a diamond whose bottom links back to the top.
fn diamond() -> Value {
    let top = node("top");
    let left = node("left");
    let right = node("right");
    let bottom = node("bottom");
    set(&top, "left", &left);
    set(&top, "right", &right);
    set(&left, "left", &bottom);
    set(&right, "right", &bottom);
    set(&bottom, "left", &top);
    top
}

/// Test that a deep copy preserves sharing and cycles without aliasing the original.
#[test]
fn test_deep_copy_preserves_shape() {
    let mut engine = Engine::new();
    let original = diamond();
    let copy = engine.copy(&original).unwrap();

    assert_eq!(copy, original);
    assert!(!copy.same_instance(&original));

    let left = copy.field("left").unwrap();
    let right = copy.field("right").unwrap();
    let bottom = left.field("left").unwrap();
    assert!(bottom.same_instance(&right.field("right").unwrap()));
    assert!(bottom.field("left").unwrap().same_instance(&copy));
    assert!(!bottom.same_instance(&original.field("left").unwrap().field("left").unwrap()));
}

/// Test that without copy references shared objects are duplicated.
#[test]
fn test_copy_without_references_duplicates_shared() {
    let mut engine = Engine::with_config(EngineConfig::new().with_copy_references(false));
    let shared = node("shared");
    let top = node("top");
    set(&top, "left", &shared);
    set(&top, "right", &shared);

    let copy = engine.copy(&top).unwrap();
    let left = copy.field("left").unwrap();
    let right = copy.field("right").unwrap();
    assert!(!left.same_instance(&right));
    assert_eq!(left, right);
}

/// Test that a shallow copy shares everything below the root.
#[test]
fn test_shallow_copy() {
    let mut engine = Engine::new();
    let original = diamond();
    let copy = engine.copy_shallow(&original).unwrap();
    assert!(!copy.same_instance(&original));
    assert!(copy.field("left").unwrap().same_instance(&original.field("left").unwrap()));
    assert!(copy.field("label").unwrap().same_instance(&original.field("label").unwrap()));
}

/// Test that primitives and null copy to themselves.
#[test]
fn test_copy_scalars() {
    let mut engine = Engine::new();
    assert!(engine.copy(&Value::Null).unwrap().is_null());
    assert_eq!(engine.copy(&Value::Double(2.5)).unwrap(), Value::Double(2.5));
    let text = Value::string("shared text");
    assert!(engine.copy(&text).unwrap().same_instance(&text));
}

/// A serializer that can write but not copy.
struct WriteOnly;

impl Serializer for WriteOnly {
    fn write(
        &self,
        _session: &mut Session<'_>,
        _output: &mut Output<'_>,
        _value: &Value,
        _generics: &[Option<Class>],
    ) -> graphwire::Result<()> {
        Ok(())
    }

    fn read(
        &self,
        session: &mut Session<'_>,
        _input: &mut Input<'_>,
        class: &Class,
        _generics: &[Option<Class>],
    ) -> graphwire::Result<Value> {
        Ok(Value::Object(session.new_instance(class)?))
    }

    fn name(&self) -> &'static str {
        "write-only"
    }
}

/// Test that copying through a serializer without copy support fails.
#[test]
fn test_unsupported_copy() {
    let opaque = Class::builder("demo.Opaque").build();
    let mut engine = Engine::new();
    engine.register_with(&opaque, Arc::new(WriteOnly));

    let err = engine.copy(&Value::object(&opaque)).unwrap_err();
    assert!(err.is_unsupported_copy());
    assert!(err.to_string().contains("write-only"));

    let holder = node("holder");
    set(&holder, "left", &Value::object(&opaque));
    assert!(engine.copy(&holder).unwrap_err().is_unsupported_copy());
}

/// Test that deep copies honor the configured depth limit.
#[test]
fn test_copy_depth_limit() {
    let head = node("0");
    let mut tail = head.clone();
    for i in 1..50 {
        let next = node(&i.to_string());
        set(&tail, "left", &next);
        tail = next;
    }

    let mut bounded = Engine::with_config(EngineConfig::new().with_max_depth(16));
    assert!(bounded.copy(&head).unwrap_err().is_depth_exceeded());

    let mut unbounded = Engine::new();
    assert_eq!(unbounded.copy(&head).unwrap(), head);
}

/// Test that a cycle copied without references stops at the depth limit.
#[test]
fn test_cycle_without_copy_references_exceeds_depth() {
    let config = EngineConfig::new().with_copy_references(false).with_max_depth(64);
    let mut engine = Engine::with_config(config);
    let looped = node("loop");
    set(&looped, "left", &looped);
    assert!(engine.copy(&looped).unwrap_err().is_depth_exceeded());
}

fn box_class() -> Class {
    Class::builder("demo.Box")
        .field(FieldDef::new("item", Class::any()))
        .build()
}

/// Copies the boxed item before creating and registering the box itself.
struct ItemFirst;

impl Serializer for ItemFirst {
    fn write(
        &self,
        _session: &mut Session<'_>,
        _output: &mut Output<'_>,
        _value: &Value,
        _generics: &[Option<Class>],
    ) -> graphwire::Result<()> {
        Ok(())
    }

    fn read(
        &self,
        session: &mut Session<'_>,
        _input: &mut Input<'_>,
        class: &Class,
        _generics: &[Option<Class>],
    ) -> graphwire::Result<Value> {
        Ok(Value::Object(session.new_instance(class)?))
    }

    fn copy(&self, session: &mut Session<'_>, original: &Value) -> graphwire::Result<Value> {
        let item = session.copy(&original.field("item").unwrap_or_default())?;
        let copy = Value::Object(session.new_instance(&box_class())?);
        copy.as_object().unwrap().borrow_mut().set("item", item)?;
        session.reference(&copy);
        Ok(copy)
    }

    fn name(&self) -> &'static str {
        "item-first"
    }
}

/// Test that a serializer copying children before registering itself still
/// keeps a shared instance shared.
#[test]
fn test_shared_copy_registered_after_children() {
    let mut engine = Engine::new();
    engine.register_with(&box_class(), Arc::new(ItemFirst));

    let shared = Value::object(&box_class());
    set(&shared, "item", &node("inside"));
    let holder = node("holder");
    set(&holder, "left", &shared);
    set(&holder, "right", &shared);

    let copy = engine.copy(&holder).unwrap();
    let left = copy.field("left").unwrap();
    let right = copy.field("right").unwrap();
    assert!(left.same_instance(&right));
    assert!(!left.same_instance(&shared));
    assert_eq!(left.field("item").unwrap().field("label").unwrap().as_str(), Some("inside"));
}
