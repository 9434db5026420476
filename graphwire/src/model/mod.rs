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

//! The dynamic type and value model.
//!
//! Serializers operate on [`Value`]s whose shape is described by [`Class`]es.
//! A class lists its fields as [`FieldDef`]s, which drive the field
//! serializers, and may declare a superclass, generic type parameters, and a
//! collection, map or array body.

mod class;
mod value;

pub use class::{Class, ClassBuilder, ClassKind, FieldDef, Literal, PrimitiveKind, Slot, TypeRef};
pub use value::{Content, Object, ObjectRef, Value};
