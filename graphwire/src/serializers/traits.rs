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

//! The [`Serializer`] trait.
//!
//! A serializer owns the byte layout of one class (or family of classes). The
//! engine decides *whether* an object's bytes appear at all: it writes the
//! class identity, the null marker and the reference marker, and only calls
//! into the serializer for a fresh, non-null object.

use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, Value};

/// Reads and writes the bytes of one class.
///
/// Serializers are shared between registrations and sessions, so they must be
/// `Send + Sync + 'static`. Per-session state belongs in the session's
/// [`GraphContext`](crate::engine::GraphContext), never in the serializer.
///
/// `generics` carries the concrete classes bound to the type parameters of the
/// class being handled, when the enclosing field declared them. An entry is
/// `None` when the parameter is unbound.
///
/// # Read protocol
///
/// A serializer whose objects can be the target of a reference must call
/// [`Session::reference`] with the new object as soon as it exists and before
/// it reads any child that might refer back to it. Serializers that build
/// their result only after reading every child (immutable values) may skip
/// the call; the engine then registers the result once `read` returns.
pub trait Serializer: Send + Sync + 'static {
    /// Writes the bytes of `value`, which is never null unless
    /// [`accepts_null`](Self::accepts_null) is true.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not match the serializer or the
    /// output cannot take the bytes.
    fn write(
        &self,
        session: &mut Session<'_>,
        output: &mut Output<'_>,
        value: &Value,
        generics: &[Option<Class>],
    ) -> Result<()>;

    /// Reads an instance of `class`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is truncated or malformed, or if an
    /// instance of `class` cannot be created.
    fn read(
        &self,
        session: &mut Session<'_>,
        input: &mut Input<'_>,
        class: &Class,
        generics: &[Option<Class>],
    ) -> Result<Value>;

    /// Produces a copy of `original`.
    ///
    /// Immutable serializers return the original. Mutable ones must call
    /// [`Session::reference`] with the copy before copying children.
    ///
    /// # Errors
    ///
    /// The default returns an unsupported-copy error for mutable classes.
    fn copy(&self, session: &mut Session<'_>, original: &Value) -> Result<Value> {
        let _ = session;
        if self.is_immutable() {
            Ok(original.clone())
        } else {
            Err(GraphError::unsupported_copy(self.name()))
        }
    }

    /// Whether this serializer writes its own null marker.
    ///
    /// When false and references are disabled, the engine writes a one byte
    /// null marker ahead of the value.
    fn accepts_null(&self) -> bool {
        false
    }

    /// Whether values handled by this serializer never change after creation.
    fn is_immutable(&self) -> bool {
        false
    }

    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;
}
