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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! graphwire is organized into layers:
//!
//! - **[`io`]**: byte buffers over memory or streams, varints, chunked framing
//! - **[`model`]**: runtime class descriptors and the dynamic [`Value`] graph
//! - **[`resolver`]**: class registrations and per-session reference tracking
//! - **[`serializers`]**: per-class encoders, including the field serializers
//!   and their schema-evolution variants
//! - **[`engine`]**: the [`Engine`] that owns registrations and drives every
//!   top-level write, read and copy
//! - **[`framing`]**: length-prefixed graphs over async streams
//! - **[`observability`]**: counters and structured error logging
//!
//! ## Features
//!
//! - **`serde`** (default): serialize [`EngineConfig`] and friends
//! - **`async`** (default): async framing over tokio streams
//! - **`observability`**: mirror engine counters to the `metrics` crate
//!
//! ## Safety
//!
//! graphwire is written in 100% safe Rust with `#![deny(unsafe_code)]`.

pub mod buffer_pool;
pub mod engine;
pub mod error;
#[cfg(feature = "async")]
pub mod framing;
pub mod io;
pub mod model;
pub mod observability;
pub mod resolver;
pub mod serializers;

pub use engine::{Engine, EngineConfig, ReferenceStrategy, Session};
pub use error::{ErrorKind, GraphError, Result};
pub use io::{BufferKind, Input, Output};
pub use model::{Class, ClassKind, FieldDef, Literal, Object, ObjectRef, PrimitiveKind, TypeRef, Value};
pub use observability::{EngineMetrics, log_error};
pub use resolver::{ClassResolver, ReferenceResolver, Registration};
pub use serializers::Serializer;
