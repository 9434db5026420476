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

//! Observability support for graphwire.
//!
//! Two pieces:
//!
//! - **[`EngineMetrics`]**: atomic counters for graphs, references, bytes and
//!   errors, mirrored to the `metrics` crate when the `observability` feature
//!   is enabled.
//! - **[`log_error`]**: structured logging of a failed operation, including
//!   the serialization trace.
//!
//! # Metrics
//!
//! ```rust
//! use graphwire::observability::EngineMetrics;
//!
//! let metrics = EngineMetrics::new();
//! metrics.record_graph_written(128);
//! metrics.record_back_reference_written();
//!
//! assert_eq!(metrics.total_graphs_written(), 1);
//! assert_eq!(metrics.total_bytes_written(), 128);
//! assert_eq!(metrics.total_back_references_written(), 1);
//! ```
//!
//! ## Exporting
//!
//! With the `observability` feature every counter is also published under the
//! `graphwire.` prefix, for example `graphwire.graphs.written` and
//! `graphwire.bytes.read`.

use crate::error::GraphError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Root objects written
    graphs_written: AtomicU64,
    /// Root objects read
    graphs_read: AtomicU64,
    /// Back-references emitted instead of object bytes
    back_references_written: AtomicU64,
    /// Back-references resolved while reading
    back_references_resolved: AtomicU64,
    /// Bytes produced by top-level writes
    bytes_written: AtomicU64,
    /// Bytes consumed by top-level reads
    bytes_read: AtomicU64,
    /// Failed top-level operations
    errors: AtomicU64,
}

impl EngineMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed top-level write of `bytes` bytes.
    pub fn record_graph_written(&self, bytes: u64) {
        self.graphs_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("graphwire.graphs.written").increment(1);
            metrics::counter!("graphwire.bytes.written").increment(bytes);
        }
    }

    /// Records a completed top-level read of `bytes` bytes.
    pub fn record_graph_read(&self, bytes: u64) {
        self.graphs_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("graphwire.graphs.read").increment(1);
            metrics::counter!("graphwire.bytes.read").increment(bytes);
        }
    }

    /// Records a back-reference marker written for an already-seen object.
    pub fn record_back_reference_written(&self) {
        self.back_references_written.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("graphwire.references.written").increment(1);
    }

    /// Records a back-reference marker resolved to an earlier object.
    pub fn record_back_reference_resolved(&self) {
        self.back_references_resolved.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("graphwire.references.resolved").increment(1);
    }

    /// Records a failed top-level operation.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("graphwire.errors").increment(1);
    }

    /// Returns the number of root objects written.
    #[must_use]
    pub fn total_graphs_written(&self) -> u64 {
        self.graphs_written.load(Ordering::Relaxed)
    }

    /// Returns the number of root objects read.
    #[must_use]
    pub fn total_graphs_read(&self) -> u64 {
        self.graphs_read.load(Ordering::Relaxed)
    }

    /// Returns the number of back-references written.
    #[must_use]
    pub fn total_back_references_written(&self) -> u64 {
        self.back_references_written.load(Ordering::Relaxed)
    }

    /// Returns the number of back-references resolved.
    #[must_use]
    pub fn total_back_references_resolved(&self) -> u64 {
        self.back_references_resolved.load(Ordering::Relaxed)
    }

    /// Returns the bytes produced by top-level writes.
    #[must_use]
    pub fn total_bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the bytes consumed by top-level reads.
    #[must_use]
    pub fn total_bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the number of failed operations.
    #[must_use]
    pub fn total_errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.graphs_written.store(0, Ordering::Relaxed);
        self.graphs_read.store(0, Ordering::Relaxed);
        self.back_references_written.store(0, Ordering::Relaxed);
        self.back_references_resolved.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

/// Logs a failed operation with structured context.
///
/// Data errors (truncated or malformed input, unknown tags) log at `WARN`;
/// everything else is a programming or configuration error and logs at
/// `ERROR`.
///
/// # Examples
///
/// ```rust
/// use graphwire::error::GraphError;
/// use graphwire::observability::log_error;
///
/// let error = GraphError::invalid_data("Invalid reference id: 9").traced("owner (demo.Ledger)");
/// log_error(&error);
/// ```
pub fn log_error(error: &GraphError) {
    use crate::error::ErrorKind;

    let depth = error.trace().len();
    let path = error.trace().join(" <- ");
    match error.kind() {
        ErrorKind::BufferUnderflow { .. }
        | ErrorKind::InvalidData(_)
        | ErrorKind::UnknownTag { .. } => {
            tracing::warn!(error = %error.kind(), depth, path = %path, "Malformed input");
        }
        kind => {
            tracing::error!(error = %kind, depth, path = %path, "Serialization failed");
        }
    }
}
