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

//! Instance creation strategies.
//!
//! Serializers never build objects directly; they ask the session for a new
//! instance, which delegates to the engine's [`InstantiatorStrategy`].

use crate::error::{GraphError, Result};
use crate::model::{Class, ClassKind, Object, ObjectRef};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Creates empty instances of classes.
pub trait InstantiatorStrategy: Send + Sync {
    /// Creates a new, empty instance of `class`.
    ///
    /// # Errors
    ///
    /// Returns an instantiation error when the class cannot have instances.
    fn new_instance(&self, class: &Class) -> Result<ObjectRef>;
}

fn check_instantiable(class: &Class) -> Result<()> {
    if class.is_abstract() {
        return Err(GraphError::instantiation(class.name(), "class is abstract"));
    }
    match class.kind() {
        ClassKind::Primitive(_) | ClassKind::Boxed(_) | ClassKind::String => Err(
            GraphError::instantiation(class.name(), "values of this class are not objects"),
        ),
        ClassKind::Array(_) => Err(GraphError::instantiation(
            class.name(),
            "arrays are created with a length",
        )),
        _ => Ok(()),
    }
}

/// Runs the class's declared initializers, like a no-argument constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructorInstantiator;

impl InstantiatorStrategy for ConstructorInstantiator {
    fn new_instance(&self, class: &Class) -> Result<ObjectRef> {
        check_instantiable(class)?;
        let mut object = Object::new(class);
        for (index, slot) in class.slots().iter().enumerate() {
            if let Some(initial) = slot.def().initial_value() {
                object.set_slot(index, initial.to_value())?;
            }
        }
        Ok(Rc::new(RefCell::new(object)))
    }
}

/// Leaves every field at its zero value, bypassing initializers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroInstantiator;

impl InstantiatorStrategy for ZeroInstantiator {
    fn new_instance(&self, class: &Class) -> Result<ObjectRef> {
        check_instantiable(class)?;
        Ok(Rc::new(RefCell::new(Object::new(class))))
    }
}

type Factory = Arc<dyn Fn(&Class) -> Result<Object> + Send + Sync>;

/// Uses per-class factories, falling back to another strategy.
///
/// # Examples
///
/// ```rust
/// use graphwire::engine::{FactoryInstantiator, InstantiatorStrategy, ZeroInstantiator};
/// use graphwire::model::{Class, FieldDef, Object, PrimitiveKind, Value};
///
/// let point = Class::builder("demo.Point")
///     .field(FieldDef::new("x", Class::primitive(PrimitiveKind::Int)))
///     .build();
/// let instantiator = FactoryInstantiator::new(ZeroInstantiator).with_factory("demo.Point", |class| {
///     let mut object = Object::new(class);
///     object.set("x", 7)?;
///     Ok(object)
/// });
///
/// let instance = instantiator.new_instance(&point).unwrap();
/// assert_eq!(instance.borrow().get("x"), Some(&Value::Int(7)));
/// ```
#[derive(Clone)]
pub struct FactoryInstantiator {
    factories: HashMap<String, Factory>,
    fallback: Arc<dyn InstantiatorStrategy>,
}

impl FactoryInstantiator {
    /// Creates a strategy with no factories.
    pub fn new(fallback: impl InstantiatorStrategy + 'static) -> Self {
        Self {
            factories: HashMap::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Adds the factory for the class named `class`.
    #[must_use]
    pub fn with_factory(
        mut self,
        class: impl Into<String>,
        factory: impl Fn(&Class) -> Result<Object> + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(class.into(), Arc::new(factory));
        self
    }
}

impl InstantiatorStrategy for FactoryInstantiator {
    fn new_instance(&self, class: &Class) -> Result<ObjectRef> {
        match self.factories.get(class.name()) {
            Some(factory) => {
                let object = factory(class)?;
                if object.class() != class {
                    return Err(GraphError::instantiation(
                        class.name(),
                        format!("factory produced {}", object.class().name()),
                    ));
                }
                Ok(Rc::new(RefCell::new(object)))
            }
            None => self.fallback.new_instance(class),
        }
    }
}

impl fmt::Debug for FactoryInstantiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&String> = self.factories.keys().collect();
        classes.sort();
        f.debug_struct("FactoryInstantiator")
            .field("classes", &classes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDef, Literal, PrimitiveKind, Value};

    fn counter() -> Class {
        Class::builder("demo.Counter")
            .field(FieldDef::new("count", Class::primitive(PrimitiveKind::Int)).initial(Literal::Int(10)))
            .field(FieldDef::new("label", Class::string()))
            .build()
    }

    #[test]
    fn test_constructor_applies_initializers() {
        let object = ConstructorInstantiator.new_instance(&counter()).unwrap();
        assert_eq!(object.borrow().get("count"), Some(&Value::Int(10)));
        assert_eq!(object.borrow().get("label"), Some(&Value::Null));
    }

    #[test]
    fn test_zero_skips_initializers() {
        let object = ZeroInstantiator.new_instance(&counter()).unwrap();
        assert_eq!(object.borrow().get("count"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_abstract_and_value_classes_fail() {
        let shape = Class::builder("demo.Shape").abstract_class().build();
        let err = ConstructorInstantiator.new_instance(&shape).unwrap_err();
        assert!(err.to_string().contains("demo.Shape"));
        assert!(ZeroInstantiator.new_instance(&Class::string()).is_err());
        assert!(ZeroInstantiator
            .new_instance(&Class::array_of(&Class::string()))
            .is_err());
    }

    #[test]
    fn test_factory_falls_back() {
        let instantiator = FactoryInstantiator::new(ConstructorInstantiator).with_factory("demo.Other", |class| {
            Ok(Object::new(class))
        });
        let object = instantiator.new_instance(&counter()).unwrap();
        assert_eq!(object.borrow().get("count"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_factory_class_mismatch() {
        let other = Class::builder("demo.Other").build();
        let instantiator = FactoryInstantiator::new(ZeroInstantiator)
            .with_factory("demo.Counter", move |_| Ok(Object::new(&other)));
        assert!(instantiator.new_instance(&counter()).is_err());
    }
}
