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

//! Field access strategies.
//!
//! Field serializers read and write slots only through [`FieldAccess`], so
//! the serializer logic is the same whichever strategy was picked when the
//! serializer was built.

use crate::error::{GraphError, Result};
use crate::model::{Class, Object, ObjectRef, TypeRef, Value};
use std::fmt;
use std::sync::Arc;

/// Reads and writes one field of an object.
pub trait FieldAccess: Send + Sync {
    /// The current value of the field.
    ///
    /// # Errors
    ///
    /// Fails with an access failure when the object has no such field.
    fn get(&self, object: &Object) -> Result<Value>;

    /// Stores `value` into the field.
    ///
    /// # Errors
    ///
    /// Fails with an access failure when the object has no such field or the
    /// value does not fit it.
    fn set(&self, object: &mut Object, value: Value) -> Result<()>;

    /// Copies the field from `original` into `copy`, passing the value through
    /// `transform`. No borrow of either object is held while `transform` runs.
    ///
    /// # Errors
    ///
    /// Fails like [`get`](Self::get), [`set`](Self::set) or `transform`.
    fn copy(
        &self,
        original: &ObjectRef,
        copy: &ObjectRef,
        transform: &mut dyn FnMut(Value) -> Result<Value>,
    ) -> Result<()> {
        let value = self.get(&original.borrow())?;
        let value = transform(value)?;
        self.set(&mut copy.borrow_mut(), value)
    }
}

/// Looks the field up by owner and name on every access and checks the type
/// of every write.
#[derive(Debug, Clone)]
pub struct IntrospectiveAccess {
    owner: String,
    name: String,
}

impl IntrospectiveAccess {
    /// Accesses field `name` declared by class `owner`.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    fn index(&self, object: &Object) -> Result<usize> {
        object
            .class()
            .slot_index(&self.owner, &self.name)
            .ok_or_else(|| {
                GraphError::access(
                    &self.name,
                    format!("{} has no field {}.{}", object.class(), self.owner, self.name),
                )
            })
    }
}

impl FieldAccess for IntrospectiveAccess {
    fn get(&self, object: &Object) -> Result<Value> {
        let index = self.index(object)?;
        Ok(object.slot(index).cloned().unwrap_or_default())
    }

    fn set(&self, object: &mut Object, value: Value) -> Result<()> {
        let index = self.index(object)?;
        let declared = object.class().slots()[index].def().declared().clone();
        if let TypeRef::Class(declared) = declared {
            let runtime = value.class_in(object);
            if !declared.accepts_class(runtime.as_ref()) {
                let found = runtime.map_or_else(|| "null".to_string(), |c| c.name().to_string());
                return Err(GraphError::access(&self.name, format!("{declared} cannot hold {found}")));
            }
        }
        object.set_slot(index, value)
    }
}

/// Uses a slot offset computed once when the serializer is built.
#[derive(Debug, Clone, Copy)]
pub struct DirectAccess {
    index: usize,
}

impl DirectAccess {
    /// Accesses slot `index`.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl FieldAccess for DirectAccess {
    fn get(&self, object: &Object) -> Result<Value> {
        object.slot(self.index).cloned().ok_or_else(|| {
            GraphError::access(
                format!("#{}", self.index),
                format!("{} has no such slot", object.class()),
            )
        })
    }

    fn set(&self, object: &mut Object, value: Value) -> Result<()> {
        object.set_slot(self.index, value)
    }
}

type Getter = Arc<dyn Fn(&Object) -> Result<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut Object, Value) -> Result<()> + Send + Sync>;

/// Goes through accessor closures.
///
/// [`GeneratedAccess::for_slot`] builds accessors for a slot; user code can
/// supply its own with [`GeneratedAccess::new`], for example to validate or
/// convert values on the way in.
#[derive(Clone)]
pub struct GeneratedAccess {
    getter: Getter,
    setter: Setter,
}

impl GeneratedAccess {
    /// Wraps a getter and a setter.
    pub fn new(
        getter: impl Fn(&Object) -> Result<Value> + Send + Sync + 'static,
        setter: impl Fn(&mut Object, Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            getter: Arc::new(getter),
            setter: Arc::new(setter),
        }
    }

    /// Accessors for slot `index` of `class`.
    #[must_use]
    pub fn for_slot(class: &Class, index: usize) -> Self {
        let name = class
            .slots()
            .get(index)
            .map_or_else(|| format!("#{index}"), |slot| slot.def().name().to_string());
        let missing = name.clone();
        Self::new(
            move |object| {
                object
                    .slot(index)
                    .cloned()
                    .ok_or_else(|| GraphError::access(&missing, format!("{} has no such slot", object.class())))
            },
            move |object, value| {
                object
                    .set_slot(index, value)
                    .map_err(|e| GraphError::access(&name, e.to_string()))
            },
        )
    }
}

impl FieldAccess for GeneratedAccess {
    fn get(&self, object: &Object) -> Result<Value> {
        (self.getter)(object)
    }

    fn set(&self, object: &mut Object, value: Value) -> Result<()> {
        (self.setter)(object, value)
    }
}

impl fmt::Debug for GeneratedAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedAccess").finish_non_exhaustive()
    }
}
