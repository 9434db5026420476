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

//! Per-element dispatch shared by the container serializers.

use super::Serializer;
use crate::engine::Session;
use crate::error::{GraphError, Result};
use crate::io::{Input, Output};
use crate::model::{Class, Value};
use std::sync::Arc;

/// How the elements of one container are written: either every element with
/// one known class and serializer, or each with its own class identity.
pub(crate) struct ElementCodec {
    fixed: Option<(Class, Arc<dyn Serializer>)>,
    can_be_null: bool,
}

impl ElementCodec {
    /// Picks the element class: the configured one, else a final class from
    /// the generics hint.
    pub(crate) fn resolve(
        session: &Session<'_>,
        configured: Option<&Class>,
        hint: Option<&Class>,
        can_be_null: bool,
    ) -> Result<Self> {
        let class = configured
            .cloned()
            .or_else(|| hint.filter(|c| c.is_final()).cloned());
        let fixed = match class {
            Some(class) => {
                let serializer = session.serializer(&class)?;
                Some((class, serializer))
            }
            None => None,
        };
        Ok(Self { fixed, can_be_null })
    }

    pub(crate) fn write(&self, session: &mut Session<'_>, output: &mut Output<'_>, value: &Value) -> Result<()> {
        let Some((_, serializer)) = &self.fixed else {
            return session.write_class_and_object(output, value);
        };
        if self.can_be_null {
            session.write_object_or_null_with(output, value, serializer.as_ref(), &[])
        } else if value.is_null() {
            Err(GraphError::null_value("Element is null but elements cannot be null"))
        } else {
            session.write_object_with(output, value, serializer.as_ref(), &[])
        }
    }

    pub(crate) fn read(&self, session: &mut Session<'_>, input: &mut Input<'_>) -> Result<Value> {
        let Some((class, serializer)) = &self.fixed else {
            return session.read_class_and_object(input);
        };
        if self.can_be_null {
            session.read_object_or_null_with(input, class, serializer.as_ref(), &[])
        } else {
            session.read_object_with(input, class, serializer.as_ref(), &[])
        }
    }
}

/// Trace entry for a failed element.
pub(crate) fn element_trace(index: usize, container: &Class) -> String {
    format!("[{index}] ({})", container.name())
}

/// Reads a `varint(size + 1)` container header; `None` for null.
pub(crate) fn read_size(input: &mut Input<'_>) -> Result<Option<usize>> {
    Ok(input.read_length()?.checked_sub(1))
}

/// Writes a `varint(size + 1)` container header.
pub(crate) fn write_size(output: &mut Output<'_>, size: usize) -> Result<()> {
    let biased = i32::try_from(size)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| GraphError::invalid_argument(format!("Container too large: {size}")))?;
    output.write_varint(biased, true)?;
    Ok(())
}
