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

//! Object identity tracking for one write or read session.
//!
//! The write side hands out sequential ids to objects the first time they are
//! written in full, so later encounters can be written as back-references.
//! The read side reserves an id slot before an object is constructed and
//! fills it as soon as construction begins, so an object's own children can
//! refer back to it while it is still being populated.

use crate::model::{Class, ClassKind, Value};
use std::collections::HashMap;

/// Tracks object identity within one session.
///
/// Implementations hold [`Value`]s, which are `Rc` based, so resolvers (and
/// the engine that owns one) are confined to a single thread.
pub trait ReferenceResolver {
    /// Assigns the next id to an object about to be written in full.
    fn add_written_object(&mut self, object: &Value) -> usize;

    /// Returns the id of an object already written in this session.
    fn written_id(&self, object: &Value) -> Option<usize>;

    /// Reserves the id of the next object to be read.
    fn next_read_id(&mut self, class: &Class) -> usize;

    /// Publishes the object for a reserved id.
    fn set_read_object(&mut self, id: usize, object: Value);

    /// Returns the object for a back-reference, possibly still under construction.
    fn read_object(&self, class: &Class, id: usize) -> Option<Value>;

    /// Clears all per-session state.
    fn reset(&mut self);

    /// Whether values of `class` take part in reference tracking.
    fn use_references(&self, class: &Class) -> bool {
        use_references_by_default(class)
    }
}

/// Default tracking policy: primitives and their boxed forms are always
/// written by value.
#[must_use]
pub fn use_references_by_default(class: &Class) -> bool {
    !matches!(class.kind(), ClassKind::Primitive(_) | ClassKind::Boxed(_))
}

/// Resolver backed by a single list searched linearly.
///
/// Identity lookup is O(n), which beats hashing for small graphs.
#[derive(Debug, Default)]
pub struct ListReferenceResolver {
    seen: Vec<Value>,
}

impl ListReferenceResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceResolver for ListReferenceResolver {
    fn add_written_object(&mut self, object: &Value) -> usize {
        self.seen.push(object.clone());
        self.seen.len() - 1
    }

    fn written_id(&self, object: &Value) -> Option<usize> {
        self.seen.iter().position(|seen| seen.same_instance(object))
    }

    fn next_read_id(&mut self, _class: &Class) -> usize {
        self.seen.push(Value::Null);
        self.seen.len() - 1
    }

    fn set_read_object(&mut self, id: usize, object: Value) {
        if let Some(slot) = self.seen.get_mut(id) {
            *slot = object;
        }
    }

    fn read_object(&self, _class: &Class, id: usize) -> Option<Value> {
        self.seen.get(id).filter(|v| !v.is_null()).cloned()
    }

    fn reset(&mut self) {
        self.seen.clear();
    }
}

/// Resolver backed by an identity-keyed hash map.
#[derive(Debug, Default)]
pub struct MapReferenceResolver {
    written: HashMap<usize, usize>,
    // Keeps written objects alive so their addresses cannot be reused mid-session.
    pinned: Vec<Value>,
    read: Vec<Option<Value>>,
}

impl MapReferenceResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferenceResolver for MapReferenceResolver {
    fn add_written_object(&mut self, object: &Value) -> usize {
        let id = self.pinned.len();
        if let Some(identity) = object.identity() {
            self.written.insert(identity, id);
        }
        self.pinned.push(object.clone());
        id
    }

    fn written_id(&self, object: &Value) -> Option<usize> {
        object
            .identity()
            .and_then(|identity| self.written.get(&identity).copied())
    }

    fn next_read_id(&mut self, _class: &Class) -> usize {
        self.read.push(None);
        self.read.len() - 1
    }

    fn set_read_object(&mut self, id: usize, object: Value) {
        if let Some(slot) = self.read.get_mut(id) {
            *slot = Some(object);
        }
    }

    fn read_object(&self, _class: &Class, id: usize) -> Option<Value> {
        self.read.get(id).cloned().flatten()
    }

    fn reset(&mut self) {
        self.written.clear();
        self.pinned.clear();
        self.read.clear();
    }
}
