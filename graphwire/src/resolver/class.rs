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

//! Class registry and the class-identity wire encoding.
//!
//! A class travels on the wire as one of:
//!
//! ```text
//! class-ref := varint(0)                         -- null
//!            | varint(id + 2)                    -- registered id
//!            | varint(1) varint(name-id) [name]  -- by name, name on first use
//! ```
//!
//! Ids and registrations live as long as the resolver. Name ids are scoped to
//! one session and live in [`ClassNames`].

use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, ClassKind};
use crate::serializers::Serializer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Wire value of the null class.
pub const NULL: i32 = 0;

/// Id marker of name-keyed registrations.
pub const NAME: i32 = -1;

/// Largest id that still fits the `id + 2` encoding.
pub const MAX_REGISTRATION_ID: u32 = (i32::MAX - 2) as u32;

/// Wire identity of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistrationId {
    /// A compact numeric id.
    Id(u32),
    /// Written by name, with a session-local name id.
    Name,
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationId::Id(id) => write!(f, "{id}"),
            RegistrationId::Name => f.write_str("NAME"),
        }
    }
}

/// The binding of one class to its wire identity and serializer.
#[derive(Clone)]
pub struct Registration {
    class: Class,
    id: RegistrationId,
    serializer: Arc<dyn Serializer>,
}

impl Registration {
    /// Creates a registration.
    pub fn new(class: Class, serializer: Arc<dyn Serializer>, id: RegistrationId) -> Self {
        Self {
            class,
            id,
            serializer,
        }
    }

    /// The registered class.
    #[must_use]
    pub fn class(&self) -> &Class {
        &self.class
    }

    /// The wire identity.
    #[must_use]
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// The serializer for values of the class.
    #[must_use]
    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("class", &self.class.name())
            .field("id", &self.id)
            .field("serializer", &self.serializer.name())
            .finish()
    }
}

/// Session-scoped name tables of the class resolver.
#[derive(Debug, Default)]
pub struct ClassNames {
    write_ids: HashMap<Class, u32>,
    next_name_id: u32,
    read_classes: HashMap<u32, Class>,
    memo: Option<(u32, Arc<Registration>)>,
}

impl ClassNames {
    /// Creates empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session. Name tables are only relevant, and only cleared,
    /// when registration is optional.
    pub fn reset(&mut self, registration_required: bool) {
        self.memo = None;
        if !registration_required {
            self.write_ids.clear();
            self.read_classes.clear();
            self.next_name_id = 0;
        }
    }
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<u32, Arc<Registration>>,
    by_class: HashMap<Class, Arc<Registration>>,
    known: HashMap<String, Class>,
}

/// Process-lifetime registry of classes and their registrations.
pub struct ClassResolver {
    tables: RwLock<Tables>,
}

impl ClassResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Stores a registration under its class and, for numeric ids, its id.
    ///
    /// A primitive registration also serves the boxed class.
    pub fn register(&self, registration: Registration) -> Arc<Registration> {
        let registration = Arc::new(registration);
        let class = registration.class().clone();
        let mut tables = self.tables.write();
        let replaced = tables.by_class.get(&class).map(|previous| previous.id());
        if let Some(RegistrationId::Id(old)) = replaced {
            if registration.id() != RegistrationId::Id(old) {
                tables.by_id.remove(&old);
            }
        }
        if let RegistrationId::Id(id) = registration.id() {
            tables.by_id.insert(id, Arc::clone(&registration));
        }
        if let ClassKind::Primitive(kind) = class.kind() {
            tables
                .by_class
                .insert(Class::boxed(*kind), Arc::clone(&registration));
        }
        tables
            .known
            .insert(class.name().to_string(), class.clone());
        tables.by_class.insert(class, Arc::clone(&registration));
        tracing::trace!(
            class = registration.class().name(),
            id = %registration.id(),
            serializer = registration.serializer().name(),
            "Register class"
        );
        registration
    }

    /// Registers a class met for the first time while registration is optional.
    pub fn register_implicit(&self, class: &Class, serializer: Arc<dyn Serializer>) -> Arc<Registration> {
        self.register(Registration::new(class.clone(), serializer, RegistrationId::Name))
    }

    /// Looks up the registration of a class.
    #[must_use]
    pub fn registration(&self, class: &Class) -> Option<Arc<Registration>> {
        self.tables.read().by_class.get(class).cloned()
    }

    /// Looks up the registration with a numeric id.
    #[must_use]
    pub fn registration_by_id(&self, id: u32) -> Option<Arc<Registration>> {
        self.tables.read().by_id.get(&id).cloned()
    }

    /// Whether a numeric id is in use.
    #[must_use]
    pub fn is_id_taken(&self, id: u32) -> bool {
        self.tables.read().by_id.contains_key(&id)
    }

    /// Makes a class resolvable by name without registering it.
    pub fn define(&self, class: &Class) {
        self.tables
            .write()
            .known
            .insert(class.name().to_string(), class.clone());
    }

    /// Resolves a class name seen on the wire.
    #[must_use]
    pub fn class_named(&self, name: &str) -> Option<Class> {
        if let Some(class) = self.tables.read().known.get(name) {
            return Some(class.clone());
        }
        let component = name.strip_suffix("[]")?;
        self.class_named(component).map(|c| Class::array_of(&c))
    }

    /// Writes the class identity of `registration`, or the null class.
    pub fn write_class(
        &self,
        output: &mut Output<'_>,
        registration: Option<&Registration>,
        names: &mut ClassNames,
    ) -> Result<()> {
        let Some(registration) = registration else {
            output.write_varint(NULL, true)?;
            return Ok(());
        };
        match registration.id() {
            RegistrationId::Id(id) => {
                let wire = i32::try_from(id)
                    .ok()
                    .and_then(|id| id.checked_add(2))
                    .ok_or_else(|| GraphError::invalid_argument(format!("Registration id too large: {id}")))?;
                output.write_varint(wire, true)?;
            }
            RegistrationId::Name => {
                output.write_varint(NAME + 2, true)?;
                self.write_name(output, registration.class(), names)?;
            }
        }
        Ok(())
    }

    fn write_name(&self, output: &mut Output<'_>, class: &Class, names: &mut ClassNames) -> Result<()> {
        if let Some(&name_id) = names.write_ids.get(class) {
            tracing::trace!(class = class.name(), name_id, "Write class name reference");
            output.write_varint(name_id as i32, true)?;
            return Ok(());
        }
        let name_id = names.next_name_id;
        names.next_name_id += 1;
        names.write_ids.insert(class.clone(), name_id);
        tracing::trace!(class = class.name(), name_id, "Write class name");
        output.write_varint(name_id as i32, true)?;
        output.write_string(Some(class.name()))
    }

    /// Reads a class identity.
    ///
    /// `resolve` maps a class read by name to its registration, registering
    /// it implicitly when allowed. Returns `None` for the null class.
    pub fn read_class(
        &self,
        input: &mut Input<'_>,
        names: &mut ClassNames,
        resolve: impl FnOnce(&Class) -> Result<Arc<Registration>>,
    ) -> Result<Option<Arc<Registration>>> {
        let wire = input.read_varint(true)?;
        match wire {
            NULL => Ok(None),
            1 => self.read_name(input, names, resolve).map(Some),
            _ if wire < 0 => Err(GraphError::invalid_data(format!("Invalid class id: {wire}"))),
            _ => {
                let id = (wire - 2) as u32;
                if let Some((memo_id, registration)) = &names.memo {
                    if *memo_id == id {
                        return Ok(Some(Arc::clone(registration)));
                    }
                }
                let registration = self.registration_by_id(id).ok_or_else(|| {
                    GraphError::unregistered(format!("Encountered unregistered class ID: {id}"))
                })?;
                names.memo = Some((id, Arc::clone(&registration)));
                Ok(Some(registration))
            }
        }
    }

    fn read_name(
        &self,
        input: &mut Input<'_>,
        names: &mut ClassNames,
        resolve: impl FnOnce(&Class) -> Result<Arc<Registration>>,
    ) -> Result<Arc<Registration>> {
        let name_id = input.read_length()? as u32;
        let class = match names.read_classes.get(&name_id) {
            Some(class) => {
                tracing::trace!(class = class.name(), name_id, "Read class name reference");
                class.clone()
            }
            None => {
                let name = input
                    .read_string()?
                    .ok_or_else(|| GraphError::invalid_data("Null class name"))?;
                let class = self
                    .class_named(&name)
                    .ok_or_else(|| GraphError::unregistered(format!("Unable to find class: {name}")))?;
                tracing::trace!(class = class.name(), name_id, "Read class name");
                names.read_classes.insert(name_id, class.clone());
                class
            }
        };
        resolve(&class)
    }
}

impl Default for ClassResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("ClassResolver")
            .field("ids", &tables.by_id.len())
            .field("classes", &tables.by_class.len())
            .field("known", &tables.known.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveKind;
    use crate::serializers::{PrimitiveSerializer, StringSerializer};

    fn int_registration() -> Registration {
        Registration::new(
            Class::primitive(PrimitiveKind::Int),
            Arc::new(PrimitiveSerializer::new(PrimitiveKind::Int)),
            RegistrationId::Id(0),
        )
    }

    #[test]
    fn test_primitive_shares_boxed_registration() {
        let resolver = ClassResolver::new();
        let registration = resolver.register(int_registration());
        let boxed = resolver
            .registration(&Class::boxed(PrimitiveKind::Int))
            .unwrap();
        assert!(Arc::ptr_eq(&registration, &boxed));
        assert!(resolver.registration_by_id(0).is_some());
    }

    #[test]
    fn test_id_path_round_trip() {
        let resolver = ClassResolver::new();
        let registration = resolver.register(int_registration());
        let mut names = ClassNames::new();
        let mut output = Output::new(8, None);
        resolver.write_class(&mut output, Some(&registration), &mut names).unwrap();
        resolver.write_class(&mut output, None, &mut names).unwrap();
        assert_eq!(output.as_bytes(), &[2, 0]);

        let mut input = Input::new(output.into_bytes());
        let read = resolver
            .read_class(&mut input, &mut names, |_| unreachable!())
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&read, &registration));
        assert!(resolver
            .read_class(&mut input, &mut names, |_| unreachable!())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_name_path_writes_name_once() {
        let resolver = ClassResolver::new();
        let class = Class::builder("demo.Unregistered").build();
        let registration = resolver.register_implicit(&class, Arc::new(StringSerializer));
        let mut names = ClassNames::new();
        let mut output = Output::new(64, None);
        resolver.write_class(&mut output, Some(&registration), &mut names).unwrap();
        let first = output.position();
        resolver.write_class(&mut output, Some(&registration), &mut names).unwrap();
        assert_eq!(output.position() - first, 2);

        let mut read_names = ClassNames::new();
        let mut input = Input::new(output.into_bytes());
        for _ in 0..2 {
            let read = resolver
                .read_class(&mut input, &mut read_names, |c| {
                    Ok(resolver.registration(c).unwrap())
                })
                .unwrap()
                .unwrap();
            assert_eq!(read.class(), &class);
        }
    }

    #[test]
    fn test_unknown_id_and_name() {
        let resolver = ClassResolver::new();
        let mut names = ClassNames::new();
        let mut input = Input::new(vec![9]);
        let err = resolver
            .read_class(&mut input, &mut names, |_| unreachable!())
            .unwrap_err();
        assert!(err.is_unregistered_class());

        let mut output = Output::new(32, None);
        output.write_varint(1, true).unwrap();
        output.write_varint(0, true).unwrap();
        output.write_string(Some("demo.Nowhere")).unwrap();
        let mut input = Input::new(output.into_bytes());
        let err = resolver
            .read_class(&mut input, &mut names, |_| unreachable!())
            .unwrap_err();
        assert!(err.to_string().contains("Unable to find class: demo.Nowhere"));
    }

    #[test]
    fn test_reset_respects_registration_required() {
        let mut names = ClassNames::new();
        names.write_ids.insert(Class::string(), 0);
        names.next_name_id = 1;
        names.reset(true);
        assert_eq!(names.write_ids.len(), 1);
        names.reset(false);
        assert!(names.write_ids.is_empty());
        assert_eq!(names.next_name_id, 0);
    }
}
