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

//! Wire buffers: byte cursors, the varint codec, and chunk framing.
//!
//! [`Output`] and [`Input`] are the only types serializers touch. Both come
//! in two [`BufferKind`]s that agree on every single fixed-width value and
//! differ only in how bulk primitive arrays are laid out.

mod chunked;
mod input;
mod output;
pub mod varint;

pub use chunked::{DEFAULT_CHUNK_SIZE, InputChunked, OutputChunked};
pub use input::Input;
pub use output::Output;

/// Encoding strategy for bulk primitive arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BufferKind {
    /// Bounds-checked path: big-endian fixed widths, varint ints and longs.
    #[default]
    Checked,
    /// Direct path: native byte order for bulk arrays and no varints.
    Direct,
}
