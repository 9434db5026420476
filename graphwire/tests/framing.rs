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

//! Integration tests for length-prefixed graph framing over async streams.

#![cfg(feature = "async")]

use graphwire::framing::{FRAME_HEADER_SIZE, read_frame, read_graph, write_frame, write_graph};
use graphwire::{Class, Engine, EngineConfig, FieldDef, PrimitiveKind, Value};
use tokio::io::AsyncWriteExt;

fn event_class() -> Class {
    Class::builder("demo.Event")
        .field(FieldDef::new("id", Class::primitive(PrimitiveKind::Long)))
        .field(FieldDef::new("source", Class::string()))
        .field(FieldDef::new("parent", Class::any()))
        .build()
}

fn event(id: i64, source: &str) -> Value {
    let value = Value::object(&event_class());
    {
        let object = value.as_object().unwrap();
        let mut object = object.borrow_mut();
        object.set("id", id).unwrap();
        object.set("source", source).unwrap();
    }
    value
}

/// Test that several graphs sent over one stream arrive in order.
#[tokio::test]
async fn test_graph_stream() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let mut writer = Engine::new();
    let mut reader = Engine::new();
    reader.define(&event_class());

    let root = event(1, "sensor");
    let child = event(2, "relay");
    child.as_object().unwrap().borrow_mut().set("parent", &root).unwrap();

    write_graph(&mut client, &mut writer, &root).await.unwrap();
    write_graph(&mut client, &mut writer, &child).await.unwrap();
    write_graph(&mut client, &mut writer, &Value::Null).await.unwrap();

    let first = read_graph(&mut server, &mut reader).await.unwrap();
    let second = read_graph(&mut server, &mut reader).await.unwrap();
    let third = read_graph(&mut server, &mut reader).await.unwrap();

    assert_eq!(first, root);
    assert_eq!(second, child);
    assert_eq!(second.field("parent").unwrap(), first);
    assert!(third.is_null());
}

/// Test that each frame is a complete session with its own class names.
#[tokio::test]
async fn test_frames_are_independent_sessions() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let mut writer = Engine::new();
    let mut reader = Engine::new();
    reader.define(&event_class());

    write_graph(&mut client, &mut writer, &event(1, "a")).await.unwrap();
    write_graph(&mut client, &mut writer, &event(2, "b")).await.unwrap();

    let first = read_frame(&mut server).await.unwrap();
    let second = read_frame(&mut server).await.unwrap();
    let name = b"demo.Event";
    assert!(first.windows(name.len()).any(|w| w == name));
    assert!(second.windows(name.len()).any(|w| w == name));

    assert_eq!(reader.from_bytes(&second).unwrap(), event(2, "b"));
}

/// Test that a reader requiring registration rejects an unknown class name.
#[tokio::test]
async fn test_reader_rejects_unregistered_class() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let mut writer = Engine::new();
    let mut reader = Engine::with_config(EngineConfig::new().with_registration_required(true));
    reader.define(&event_class());

    write_graph(&mut client, &mut writer, &event(7, "edge")).await.unwrap();
    let err = read_graph(&mut server, &mut reader).await.unwrap_err();
    assert!(err.is_unregistered_class());
}

/// Test that matching explicit ids round trip without class names on the wire.
#[tokio::test]
async fn test_registered_ids() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);
    let mut writer = Engine::new();
    let mut reader = Engine::new();
    writer.register_with_id(&event_class(), None, 30).unwrap();
    reader.register_with_id(&event_class(), None, 30).unwrap();

    write_graph(&mut client, &mut writer, &event(3, "core")).await.unwrap();
    let frame = read_frame(&mut server).await.unwrap();
    assert_eq!(frame[0], 32);
    assert_eq!(reader.from_bytes(&frame).unwrap(), event(3, "core"));
}

/// Test that a stream closed mid-frame reports an error.
#[tokio::test]
async fn test_closed_mid_frame() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let mut header = [0u8; FRAME_HEADER_SIZE];
    header.copy_from_slice(&10u32.to_be_bytes());
    client.write_all(&header).await.unwrap();
    client.write_all(&[1, 2, 3]).await.unwrap();
    drop(client);

    assert!(read_frame(&mut server).await.is_err());
}

/// Test that raw frames pass through untouched.
#[tokio::test]
async fn test_raw_frames() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    write_frame(&mut client, b"payload").await.unwrap();
    write_frame(&mut client, b"").await.unwrap();
    assert_eq!(read_frame(&mut server).await.unwrap(), b"payload");
    assert!(read_frame(&mut server).await.unwrap().is_empty());
}
