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

//! Serializers for every class kind.
//!
//! A [`Serializer`] converts one class of [`Value`](crate::model::Value)
//! to and from bytes. The engine picks a default per class kind; custom
//! serializers are registered per class and can compose the public
//! element helpers of [`CollectionSerializer`] and [`MapSerializer`].

mod array;
mod collection;
mod element;
pub mod field;
mod map;
mod primitives;
mod traits;

pub use array::{ObjectArraySerializer, PrimitiveArraySerializer};
pub use collection::CollectionSerializer;
pub use map::MapSerializer;
pub use primitives::{PrimitiveSerializer, StringSerializer};
pub use traits::Serializer;
