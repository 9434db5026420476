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

//! Per-graph session state and the object protocol.
//!
//! A [`Session`] is the view serializers get of the engine while one top-level
//! operation runs. It writes and reads the framing around every object:
//!
//! ```text
//! object     := [class-ref] ref-marker body
//! ref-marker := varint(0)        -- null (only where null is allowed)
//!             | varint(1)        -- a new object, body follows
//!             | varint(id + 2)   -- the object with that id, no body
//! ```
//!
//! When reference tracking is off, or the class does not track references,
//! nullable positions of serializers that do not handle null themselves carry
//! a single byte, 0 for null and 1 for present.

use super::config::ReferenceStrategy;
use super::engine::Core;
use crate::error::{ErrorKind, GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, ObjectRef, Value};
use crate::resolver::{ClassNames, ListReferenceResolver, MapReferenceResolver, ReferenceResolver, Registration};
use crate::serializers::Serializer;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const NULL: u8 = 0;
const NOT_NULL: u8 = 1;

/// Scratch storage for serializers, cleared at the start of every session.
///
/// Entries are keyed by the serializer that owns them, so two serializers
/// never see each other's state.
#[derive(Default)]
pub struct GraphContext {
    entries: HashMap<usize, Box<dyn Any>>,
}

fn owner_key<S: ?Sized>(owner: &S) -> usize {
    (owner as *const S).cast::<()>() as usize
}

impl GraphContext {
    /// Returns the entry of `owner`, if it holds a `T`.
    #[must_use]
    pub fn get<T: Any, S: ?Sized>(&self, owner: &S) -> Option<&T> {
        self.entries.get(&owner_key(owner))?.downcast_ref()
    }

    /// Whether `owner` has an entry.
    #[must_use]
    pub fn contains<S: ?Sized>(&self, owner: &S) -> bool {
        self.entries.contains_key(&owner_key(owner))
    }

    /// Stores the entry of `owner`, replacing any previous one.
    pub fn insert<T: Any, S: ?Sized>(&mut self, owner: &S, value: T) {
        self.entries.insert(owner_key(owner), Box::new(value));
    }

    /// Removes the entry of `owner`.
    pub fn remove<S: ?Sized>(&mut self, owner: &S) {
        self.entries.remove(&owner_key(owner));
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Debug for GraphContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphContext")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[derive(Default)]
struct CopyState {
    depth: usize,
    shallow: bool,
    originals: HashMap<usize, (Value, Value)>,
    // One entry per copy in progress; `Some` until that copy is registered.
    needs_reference: Vec<Option<Value>>,
}

/// Mutable state of the session in progress.
pub(crate) struct SessionState {
    references: Box<dyn ReferenceResolver>,
    names: ClassNames,
    context: GraphContext,
    read_reference_ids: Vec<Option<usize>>,
    depth: usize,
    copy: CopyState,
}

impl SessionState {
    pub(crate) fn new(strategy: ReferenceStrategy) -> Self {
        let references: Box<dyn ReferenceResolver> = match strategy {
            ReferenceStrategy::Map => Box::new(MapReferenceResolver::new()),
            ReferenceStrategy::List => Box::new(ListReferenceResolver::new()),
        };
        Self {
            references,
            names: ClassNames::new(),
            context: GraphContext::default(),
            read_reference_ids: Vec::new(),
            depth: 0,
            copy: CopyState::default(),
        }
    }

    /// Forgets everything learned in the previous session.
    pub(crate) fn reset(&mut self, registration_required: bool) {
        self.references.reset();
        self.names.reset(registration_required);
        self.context.clear();
        self.read_reference_ids.clear();
        self.depth = 0;
        self.copy = CopyState::default();
    }
}

/// Outcome of reading a reference marker.
enum Marker {
    /// Null or a back-reference; no body follows.
    Resolved(Value),
    /// A body follows; the value is the read-id stack height after the push.
    Fresh(usize),
}

/// The engine as seen by serializers during one top-level operation.
///
/// Sessions are created by the [`Engine`](crate::engine::Engine) and live
/// only for the duration of a single write, read or copy.
pub struct Session<'e> {
    core: &'e Core,
    state: &'e mut SessionState,
}

impl<'e> Session<'e> {
    pub(crate) fn new(core: &'e Core, state: &'e mut SessionState) -> Self {
        Self { core, state }
    }

    /// Current object nesting depth; 1 inside the root object's serializer.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.depth
    }

    /// Whether object identity is tracked.
    #[must_use]
    pub fn references_enabled(&self) -> bool {
        self.core.config.references
    }

    /// Per-session scratch storage.
    pub fn graph_context(&mut self) -> &mut GraphContext {
        &mut self.state.context
    }

    /// Returns the registration of `class`, registering it implicitly when
    /// registration is optional.
    ///
    /// # Errors
    ///
    /// Fails with an unregistered-class error when registration is required.
    pub fn registration(&self, class: &Class) -> Result<Arc<Registration>> {
        self.core.registration(class)
    }

    /// Returns the serializer registered for `class`.
    ///
    /// # Errors
    ///
    /// Fails like [`registration`](Self::registration).
    pub fn serializer(&self, class: &Class) -> Result<Arc<dyn Serializer>> {
        Ok(Arc::clone(self.registration(class)?.serializer()))
    }

    /// Creates an empty instance of `class` with the engine's instantiator.
    ///
    /// # Errors
    ///
    /// Returns an instantiation error for classes that cannot have instances.
    pub fn new_instance(&self, class: &Class) -> Result<ObjectRef> {
        self.core.instantiator.new_instance(class)
    }

    /// Writes a class identity, or the null class for `None`.
    ///
    /// # Errors
    ///
    /// Fails when the class is unregistered and registration is required.
    pub fn write_class(
        &mut self,
        output: &mut Output<'_>,
        class: Option<&Class>,
    ) -> Result<Option<Arc<Registration>>> {
        let registration = class.map(|c| self.registration(c)).transpose()?;
        self.core
            .classes
            .write_class(output, registration.as_deref(), &mut self.state.names)?;
        Ok(registration)
    }

    /// Reads a class identity; `None` for the null class.
    ///
    /// # Errors
    ///
    /// Fails on unknown ids and names.
    pub fn read_class(&mut self, input: &mut Input<'_>) -> Result<Option<Arc<Registration>>> {
        let core = self.core;
        core.classes
            .read_class(input, &mut self.state.names, |class| core.registration(class))
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state.depth >= self.core.config.max_depth {
            return Err(GraphError::new(ErrorKind::DepthExceeded(self.state.depth)));
        }
        self.state.depth += 1;
        let result = f(self);
        self.state.depth -= 1;
        result
    }

    /// Writes the reference marker of `value`. Returns true when nothing else
    /// is to be written for it.
    fn write_reference_or_null(
        &mut self,
        output: &mut Output<'_>,
        value: &Value,
        may_be_null: bool,
    ) -> Result<bool> {
        let Some(class) = value.class() else {
            tracing::trace!(depth = self.state.depth, "Write object: null");
            output.write_varint(i32::from(NULL), true)?;
            return Ok(true);
        };
        if !self.state.references.use_references(&class) {
            if may_be_null {
                output.write_varint(i32::from(NOT_NULL), true)?;
            }
            return Ok(false);
        }
        if let Some(id) = self.state.references.written_id(value) {
            tracing::trace!(id, class = class.name(), "Write object reference");
            output.write_varint(reference_marker(id)?, true)?;
            self.core.metrics.record_back_reference_written();
            return Ok(true);
        }
        let id = self.state.references.add_written_object(value);
        tracing::trace!(id, class = class.name(), "Write initial object reference");
        output.write_varint(i32::from(NOT_NULL), true)?;
        Ok(false)
    }

    fn read_reference_or_null(
        &mut self,
        input: &mut Input<'_>,
        class: &Class,
        may_be_null: bool,
    ) -> Result<Marker> {
        if !self.state.references.use_references(class) {
            if may_be_null && input.read_varint(true)? == i32::from(NULL) {
                tracing::trace!(depth = self.state.depth, "Read object: null");
                return Ok(Marker::Resolved(Value::Null));
            }
            self.state.read_reference_ids.push(None);
            return Ok(Marker::Fresh(self.state.read_reference_ids.len()));
        }
        let marker = input.read_varint(true)?;
        if marker == i32::from(NULL) {
            tracing::trace!(depth = self.state.depth, "Read object: null");
            return Ok(Marker::Resolved(Value::Null));
        }
        if marker == i32::from(NOT_NULL) {
            let id = self.state.references.next_read_id(class);
            tracing::trace!(id, class = class.name(), "Read initial object reference");
            self.state.read_reference_ids.push(Some(id));
            return Ok(Marker::Fresh(self.state.read_reference_ids.len()));
        }
        let id = marker
            .checked_sub(2)
            .and_then(|id| usize::try_from(id).ok())
            .ok_or_else(|| GraphError::invalid_data(format!("Invalid reference marker: {marker}")))?;
        let object = self
            .state
            .references
            .read_object(class, id)
            .ok_or_else(|| GraphError::invalid_data(format!("Invalid reference id: {id}")))?;
        tracing::trace!(id, class = class.name(), "Read object reference");
        self.core.metrics.record_back_reference_resolved();
        Ok(Marker::Resolved(object))
    }

    /// Registers `value` under the id pushed at `height`, unless the
    /// serializer already did so through [`reference`](Self::reference).
    fn finish_read(&mut self, height: usize, value: &Value) {
        if self.state.read_reference_ids.len() != height {
            return;
        }
        if let Some(Some(id)) = self.state.read_reference_ids.pop() {
            if !value.is_null() {
                self.state.references.set_read_object(id, value.clone());
            }
        }
    }

    /// Registers a freshly created object so later back-references resolve to
    /// it. While copying, records `copy` as the copy of the object in progress.
    ///
    /// Serializers call this right after creating an instance and before
    /// reading or copying its children.
    pub fn reference(&mut self, object: &Value) {
        if self.state.copy.depth > 0 {
            if let Some(original) = self.state.copy.needs_reference.last_mut().and_then(Option::take) {
                self.remember_copy(original, object);
            }
        } else if self.references_enabled() && !object.is_null() {
            if let Some(Some(id)) = self.state.read_reference_ids.pop() {
                self.state.references.set_read_object(id, object.clone());
            }
        }
    }

    /// Writes a non-null object whose class the reader knows, with the
    /// serializer registered for its class.
    ///
    /// # Errors
    ///
    /// Fails for null values and on any serializer error.
    pub fn write_object(&mut self, output: &mut Output<'_>, value: &Value) -> Result<()> {
        let serializer = self.value_serializer(value)?;
        self.write_object_with(output, value, serializer.as_ref(), &[])
    }

    /// Writes a non-null object whose class the reader knows.
    ///
    /// # Errors
    ///
    /// Fails for null values and on any serializer error.
    pub fn write_object_with(
        &mut self,
        output: &mut Output<'_>,
        value: &Value,
        serializer: &dyn Serializer,
        generics: &[Option<Class>],
    ) -> Result<()> {
        if value.is_null() {
            return Err(GraphError::null_value("object cannot be null."));
        }
        self.nested(|session| {
            if session.references_enabled() && session.write_reference_or_null(output, value, false)? {
                return Ok(());
            }
            tracing::trace!(class = %value.type_name(), depth = session.state.depth, "Write object");
            serializer.write(session, output, value, generics)
        })
    }

    /// Writes a possibly-null object of statically known `class`.
    ///
    /// # Errors
    ///
    /// Fails on any serializer error.
    pub fn write_object_or_null(&mut self, output: &mut Output<'_>, value: &Value, class: &Class) -> Result<()> {
        let serializer = self.serializer(class)?;
        self.write_object_or_null_with(output, value, serializer.as_ref(), &[])
    }

    /// Writes a possibly-null object with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails on any serializer error.
    pub fn write_object_or_null_with(
        &mut self,
        output: &mut Output<'_>,
        value: &Value,
        serializer: &dyn Serializer,
        generics: &[Option<Class>],
    ) -> Result<()> {
        self.nested(|session| {
            if session.references_enabled() {
                if session.write_reference_or_null(output, value, true)? {
                    return Ok(());
                }
            } else if !serializer.accepts_null() {
                if value.is_null() {
                    tracing::trace!(depth = session.state.depth, "Write object: null");
                    output.write_byte(NULL)?;
                    return Ok(());
                }
                output.write_byte(NOT_NULL)?;
            }
            tracing::trace!(class = %value.type_name(), depth = session.state.depth, "Write object");
            serializer.write(session, output, value, generics)
        })
    }

    /// Writes the class of `value` followed by the object; null is written
    /// as the null class.
    ///
    /// # Errors
    ///
    /// Fails on unregistered classes when registration is required and on any
    /// serializer error.
    pub fn write_class_and_object(&mut self, output: &mut Output<'_>, value: &Value) -> Result<()> {
        self.write_class_and_object_generic(output, value, &[])
    }

    /// Like [`write_class_and_object`](Self::write_class_and_object), passing
    /// `generics` to the serializer.
    ///
    /// # Errors
    ///
    /// Fails like [`write_class_and_object`](Self::write_class_and_object).
    pub fn write_class_and_object_generic(
        &mut self,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()> {
        self.nested(|session| {
            let class = value.class();
            let Some(registration) = session.write_class(output, class.as_ref())? else {
                return Ok(());
            };
            if session.references_enabled() && session.write_reference_or_null(output, value, false)? {
                return Ok(());
            }
            tracing::trace!(class = registration.class().name(), depth = session.state.depth, "Write object");
            registration.serializer().write(session, output, value, generics)
        })
    }

    /// Reads a non-null object of `class` with its registered serializer.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and any serializer error.
    pub fn read_object(&mut self, input: &mut Input<'_>, class: &Class) -> Result<Value> {
        let serializer = self.serializer(class)?;
        self.read_object_with(input, class, serializer.as_ref(), &[])
    }

    /// Reads a non-null object of `class` with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and any serializer error.
    pub fn read_object_with(
        &mut self,
        input: &mut Input<'_>,
        class: &Class,
        serializer: &dyn Serializer,
        generics: &[Option<Class>],
    ) -> Result<Value> {
        self.nested(|session| {
            if session.references_enabled() {
                return session.read_body(input, class, serializer, generics, false);
            }
            serializer.read(session, input, class, generics)
        })
    }

    /// Reads a possibly-null object of `class` with its registered serializer.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and any serializer error.
    pub fn read_object_or_null(&mut self, input: &mut Input<'_>, class: &Class) -> Result<Value> {
        let serializer = self.serializer(class)?;
        self.read_object_or_null_with(input, class, serializer.as_ref(), &[])
    }

    /// Reads a possibly-null object of `class` with `serializer`.
    ///
    /// # Errors
    ///
    /// Fails on malformed input and any serializer error.
    pub fn read_object_or_null_with(
        &mut self,
        input: &mut Input<'_>,
        class: &Class,
        serializer: &dyn Serializer,
        generics: &[Option<Class>],
    ) -> Result<Value> {
        self.nested(|session| {
            if session.references_enabled() {
                return session.read_body(input, class, serializer, generics, true);
            }
            if !serializer.accepts_null() && input.read_byte()? == NULL {
                tracing::trace!(depth = session.state.depth, "Read object: null");
                return Ok(Value::Null);
            }
            serializer.read(session, input, class, generics)
        })
    }

    /// Reads a class identity followed by an object of that class.
    ///
    /// # Errors
    ///
    /// Fails on unknown classes, malformed input and any serializer error.
    pub fn read_class_and_object(&mut self, input: &mut Input<'_>) -> Result<Value> {
        self.read_class_and_object_generic(input, &[])
    }

    /// Like [`read_class_and_object`](Self::read_class_and_object), passing
    /// `generics` to the serializer.
    ///
    /// # Errors
    ///
    /// Fails like [`read_class_and_object`](Self::read_class_and_object).
    pub fn read_class_and_object_generic(
        &mut self,
        input: &mut Input<'_>,
        generics: &[Option<Class>],
    ) -> Result<Value> {
        self.nested(|session| {
            let Some(registration) = session.read_class(input)? else {
                return Ok(Value::Null);
            };
            let class = registration.class();
            let serializer = registration.serializer().as_ref();
            if session.references_enabled() {
                return session.read_body(input, class, serializer, generics, false);
            }
            serializer.read(session, input, class, generics)
        })
    }

    fn read_body(
        &mut self,
        input: &mut Input<'_>,
        class: &Class,
        serializer: &dyn Serializer,
        generics: &[Option<Class>],
        may_be_null: bool,
    ) -> Result<Value> {
        match self.read_reference_or_null(input, class, may_be_null)? {
            Marker::Resolved(value) => Ok(value),
            Marker::Fresh(height) => {
                tracing::trace!(class = class.name(), depth = self.state.depth, "Read object");
                let value = serializer.read(self, input, class, generics)?;
                self.finish_read(height, &value);
                Ok(value)
            }
        }
    }

    fn value_serializer(&self, value: &Value) -> Result<Arc<dyn Serializer>> {
        let class = value
            .class()
            .ok_or_else(|| GraphError::null_value("object cannot be null."))?;
        self.serializer(&class)
    }

    /// Deep-copies `value`, preserving sharing and cycles when the engine's
    /// `copy_references` is on.
    ///
    /// Null and primitive values are returned as they are. Inside a shallow
    /// copy, nested values are returned as they are too.
    ///
    /// # Errors
    ///
    /// Fails when a serializer in the graph cannot copy.
    pub fn copy(&mut self, value: &Value) -> Result<Value> {
        if value.identity().is_none() || self.state.copy.shallow {
            return Ok(value.clone());
        }
        self.copy_value(value)
    }

    /// Copies `value` itself while leaving everything it refers to shared.
    ///
    /// # Errors
    ///
    /// Fails when the value's serializer cannot copy.
    pub fn copy_shallow(&mut self, value: &Value) -> Result<Value> {
        if value.identity().is_none() {
            return Ok(value.clone());
        }
        let previous = std::mem::replace(&mut self.state.copy.shallow, true);
        let result = self.copy_value(value);
        self.state.copy.shallow = previous;
        result
    }

    fn copy_value(&mut self, value: &Value) -> Result<Value> {
        self.nested(|session| {
            session.state.copy.depth += 1;
            let result = session.copy_tracked(value);
            session.state.copy.depth -= 1;
            result
        })
    }

    fn copy_tracked(&mut self, value: &Value) -> Result<Value> {
        if let Some(identity) = value.identity() {
            if let Some((_, existing)) = self.state.copy.originals.get(&identity) {
                return Ok(existing.clone());
            }
        }
        let pending = self.core.config.copy_references.then(|| value.clone());
        self.state.copy.needs_reference.push(pending);
        let copied = self
            .value_serializer(value)
            .and_then(|serializer| serializer.copy(self, value));
        let pending = self.state.copy.needs_reference.pop().flatten();
        let copy = copied?;
        if let Some(original) = pending {
            self.remember_copy(original, &copy);
        }
        tracing::trace!(class = %value.type_name(), "Copy object");
        Ok(copy)
    }

    fn remember_copy(&mut self, original: Value, copy: &Value) {
        if let Some(identity) = original.identity() {
            self.state.copy.originals.insert(identity, (original, copy.clone()));
        }
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("depth", &self.state.depth)
            .field("references", &self.references_enabled())
            .field("context", &self.state.context)
            .finish_non_exhaustive()
    }
}

fn reference_marker(id: usize) -> Result<i32> {
    i32::try_from(id)
        .ok()
        .and_then(|id| id.checked_add(2))
        .ok_or_else(|| GraphError::invalid_argument(format!("Too many objects in one graph: {id}")))
}
