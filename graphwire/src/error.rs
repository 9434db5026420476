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

//! Error types for graphwire.
//!
//! Every failure raised by the engine, the wire buffers, or a serializer is a
//! [`GraphError`]. The error carries an [`ErrorKind`] that classifies the
//! failure and a trace that grows as the failure propagates out of nested
//! fields and elements, so a failure deep inside a graph reports the full path
//! from the root to the point of failure.
//!
//! # Examples
//!
//! ```rust
//! use graphwire::error::{ErrorKind, GraphError};
//!
//! let mut error = GraphError::unknown_tag(7, "demo.Account");
//! error.add_trace("owner (demo.Ledger)");
//!
//! assert!(error.is_unknown_tag());
//! assert_eq!(error.trace(), &["owner (demo.Ledger)".to_string()]);
//! assert!(error.to_string().contains("Serialization trace:"));
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Result alias used throughout graphwire.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Classification of a [`GraphError`].
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A class id resolved to no registration, a class name could not be
    /// resolved, or registration is required and the class is not registered.
    #[error("{message}")]
    UnregisteredClass {
        /// Description of the missing registration
        message: String,
    },

    /// A tagged field stream carried a tag with no matching field.
    #[error("Unknown field tag: {tag} ({class})")]
    UnknownTag {
        /// The unmatched tag
        tag: u32,
        /// Name of the class being read
        class: String,
    },

    /// A write needed more room than the buffer may grow to.
    #[error("Buffer overflow. Max capacity: {max_capacity}, required: {required}")]
    BufferOverflow {
        /// Configured maximum buffer size
        max_capacity: usize,
        /// Bytes the write required
        required: usize,
    },

    /// A read needed more bytes than the source could supply.
    #[error("Buffer underflow. Required: {required}, available: {available}")]
    BufferUnderflow {
        /// Bytes the read required
        required: usize,
        /// Bytes that were available
        available: usize,
    },

    /// `copy` was called on a serializer that cannot copy.
    #[error("Serializer does not support copy: {serializer}")]
    UnsupportedCopy {
        /// Name of the serializer
        serializer: String,
    },

    /// A field accessor could not get or set a value.
    #[error("Unable to access field {field}: {reason}")]
    AccessFailure {
        /// The field being accessed
        field: String,
        /// Why the access failed
        reason: String,
    },

    /// A null value appeared where null is not allowed.
    #[error("{0}")]
    NullValue(String),

    /// The input bytes do not describe a valid graph.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A caller passed an argument the engine cannot use.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An instance of a class could not be created.
    #[error("Class cannot be created: {class} ({reason})")]
    Instantiation {
        /// Name of the class
        class: String,
        /// Why instantiation failed
        reason: String,
    },

    /// Graph nesting exceeded the configured maximum depth.
    #[error("Max depth exceeded: {0}")]
    DepthExceeded(usize),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

/// The single error type for all engine and serializer failures.
///
/// A `GraphError` pairs an [`ErrorKind`] with a serialization trace. Each
/// serializer that observes a failure while processing a nested field or
/// element appends a `"<descriptor> (<enclosing type>)"` entry before
/// propagating the error.
#[derive(Debug)]
pub struct GraphError {
    kind: ErrorKind,
    trace: Vec<String>,
}

impl GraphError {
    /// Creates an error of the given kind with an empty trace.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            trace: Vec::new(),
        }
    }

    /// Creates an `UnregisteredClass` error.
    pub fn unregistered(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnregisteredClass {
            message: message.into(),
        })
    }

    /// Creates an `UnknownTag` error.
    pub fn unknown_tag(tag: u32, class: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownTag {
            tag,
            class: class.into(),
        })
    }

    /// Creates an `UnsupportedCopy` error.
    pub fn unsupported_copy(serializer: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedCopy {
            serializer: serializer.into(),
        })
    }

    /// Creates an `AccessFailure` error.
    pub fn access(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessFailure {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a `NullValue` error.
    pub fn null_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NullValue(message.into()))
    }

    /// Creates an `InvalidData` error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidData(message.into()))
    }

    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(message.into()))
    }

    /// Creates an `Instantiation` error.
    pub fn instantiation(class: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Instantiation {
            class: class.into(),
            reason: reason.into(),
        })
    }

    /// Appends one entry to the serialization trace.
    pub fn add_trace(&mut self, entry: impl Into<String>) {
        self.trace.push(entry.into());
    }

    /// Appends one trace entry and returns the error, for use in `map_err`.
    #[must_use]
    pub fn traced(mut self, entry: impl Into<String>) -> Self {
        self.add_trace(entry);
        self
    }

    /// Returns the error classification.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the trace entries, innermost first.
    #[must_use]
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Returns `true` for [`ErrorKind::UnregisteredClass`].
    #[must_use]
    pub fn is_unregistered_class(&self) -> bool {
        matches!(self.kind, ErrorKind::UnregisteredClass { .. })
    }

    /// Returns `true` for [`ErrorKind::UnknownTag`].
    #[must_use]
    pub fn is_unknown_tag(&self) -> bool {
        matches!(self.kind, ErrorKind::UnknownTag { .. })
    }

    /// Returns `true` for [`ErrorKind::BufferOverflow`].
    #[must_use]
    pub fn is_buffer_overflow(&self) -> bool {
        matches!(self.kind, ErrorKind::BufferOverflow { .. })
    }

    /// Returns `true` for [`ErrorKind::BufferUnderflow`].
    #[must_use]
    pub fn is_buffer_underflow(&self) -> bool {
        matches!(self.kind, ErrorKind::BufferUnderflow { .. })
    }

    /// Returns `true` for [`ErrorKind::UnsupportedCopy`].
    #[must_use]
    pub fn is_unsupported_copy(&self) -> bool {
        matches!(self.kind, ErrorKind::UnsupportedCopy { .. })
    }

    /// Returns `true` for [`ErrorKind::AccessFailure`].
    #[must_use]
    pub fn is_access_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::AccessFailure { .. })
    }

    /// Returns `true` for [`ErrorKind::NullValue`].
    #[must_use]
    pub fn is_null_value(&self) -> bool {
        matches!(self.kind, ErrorKind::NullValue(_))
    }

    /// Returns `true` for [`ErrorKind::DepthExceeded`].
    #[must_use]
    pub fn is_depth_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::DepthExceeded(_))
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.trace.is_empty() {
            write!(f, "\nSerialization trace:")?;
            for entry in &self.trace {
                write!(f, "\n{}", entry)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ErrorKind> for GraphError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<io::Error> for GraphError {
    fn from(error: io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_without_trace() {
        let error = GraphError::unknown_tag(3, "demo.Point");
        assert_eq!(error.to_string(), "Unknown field tag: 3 (demo.Point)");
    }

    #[test]
    fn test_trace_accumulates_innermost_first() {
        let error = GraphError::null_value("Field value is null but not_null is set")
            .traced("name (demo.Person)")
            .traced("owner (demo.Account)");
        assert_eq!(
            error.to_string(),
            "Field value is null but not_null is set\nSerialization trace:\nname (demo.Person)\nowner (demo.Account)"
        );
        assert_eq!(error.trace().len(), 2);
    }

    #[test]
    fn test_io_source() {
        let error = GraphError::from(io::Error::other("disk gone"));
        assert!(error.source().is_some());
        assert!(matches!(error.kind(), ErrorKind::Io(_)));
    }

    #[test]
    fn test_predicates() {
        assert!(GraphError::unregistered("Class is not registered: x").is_unregistered_class());
        assert!(GraphError::unsupported_copy("Custom").is_unsupported_copy());
        assert!(GraphError::access("a", "private").is_access_failure());
        assert!(GraphError::new(ErrorKind::DepthExceeded(8)).is_depth_exceeded());
        assert!(
            GraphError::new(ErrorKind::BufferOverflow {
                max_capacity: 4,
                required: 8
            })
            .is_buffer_overflow()
        );
        assert!(
            GraphError::new(ErrorKind::BufferUnderflow {
                required: 4,
                available: 0
            })
            .is_buffer_underflow()
        );
    }
}
