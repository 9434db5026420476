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

//! Chunk framing over the wire buffer.
//!
//! A chunk sequence is a run of `varint(length) payload` chunks terminated by
//! a zero-length chunk. A reader that does not understand the payload can
//! step over the whole sequence using only the length prefixes.
//!
//! ```text
//! +-------------+-----------+-------------+-----------+-----+------+
//! | varint(len) | len bytes | varint(len) | len bytes | ... | 0x00 |
//! +-------------+-----------+-------------+-----------+-----+------+
//! ```
//!
//! # Examples
//!
//! ```rust
//! use graphwire::io::{Input, InputChunked, Output, OutputChunked};
//!
//! # fn example() -> graphwire::Result<()> {
//! let mut output = Output::new(64, None);
//! for value in [10, 20] {
//!     let mut chunked = OutputChunked::new(&mut output, 1024);
//!     chunked.write_i32(value)?;
//!     chunked.end_chunks()?;
//! }
//!
//! let mut input = Input::new(output.into_bytes());
//! let mut chunked = InputChunked::new(&mut input);
//! chunked.next_chunks()?;
//! assert_eq!(chunked.chunk()?.read_i32()?, 20);
//! # Ok(())
//! # }
//! ```

use super::{Input, Output};
use crate::buffer_pool::BufferPool;
use crate::error::{GraphError, Result};
use std::ops::{Deref, DerefMut};

/// Chunk size used by the compatible field serializer.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Buffers writes and emits them to a parent [`Output`] as framed chunks.
///
/// The buffered region dereferences to an [`Output`] that shares the
/// parent's [`BufferKind`](super::BufferKind), so any serializer can write
/// into it.
pub struct OutputChunked<'a, 's> {
    parent: &'a mut Output<'s>,
    chunk: Output<'static>,
    chunk_size: usize,
}

impl<'a, 's> OutputChunked<'a, 's> {
    /// Starts a chunk sequence on `parent` with chunks of at most `chunk_size` bytes.
    pub fn new(parent: &'a mut Output<'s>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunk = Output::from_vec(BufferPool::take(chunk_size)).with_kind(parent.kind());
        Self {
            parent,
            chunk,
            chunk_size,
        }
    }

    /// Emits the buffered bytes as one or more length-prefixed chunks.
    pub fn flush(&mut self) -> Result<()> {
        for piece in self.chunk.as_bytes().chunks(self.chunk_size) {
            let len = i32::try_from(piece.len())
                .map_err(|_| GraphError::invalid_argument("Chunk size exceeds i32::MAX"))?;
            self.parent.write_varint(len, true)?;
            self.parent.write_bytes(piece)?;
        }
        self.chunk.clear();
        Ok(())
    }

    /// Flushes and writes the zero-length end-of-sequence marker.
    pub fn end_chunks(&mut self) -> Result<()> {
        self.flush()?;
        self.parent.write_byte(0)
    }
}

impl Deref for OutputChunked<'_, '_> {
    type Target = Output<'static>;

    fn deref(&self) -> &Self::Target {
        &self.chunk
    }
}

impl DerefMut for OutputChunked<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.chunk
    }
}

impl Drop for OutputChunked<'_, '_> {
    fn drop(&mut self) {
        BufferPool::give(self.chunk.take_buffer());
    }
}

/// Reads chunk sequences from a parent [`Input`].
///
/// [`chunk`](Self::chunk) exposes the current sequence as an [`Input`] whose
/// end is the end of the sequence. [`next_chunks`](Self::next_chunks) moves on
/// to the following sequence, stepping over any part not yet consumed.
pub struct InputChunked<'a, 's> {
    parent: &'a mut Input<'s>,
    current: Option<Input<'static>>,
}

impl<'a, 's> InputChunked<'a, 's> {
    /// Positions a chunk reader at the next sequence of `parent`.
    pub fn new(parent: &'a mut Input<'s>) -> Self {
        Self {
            parent,
            current: None,
        }
    }

    /// Returns the current chunk sequence, reading it from the parent on first access.
    pub fn chunk(&mut self) -> Result<&mut Input<'static>> {
        if self.current.is_none() {
            let mut payload = BufferPool::take(DEFAULT_CHUNK_SIZE);
            loop {
                let len = self.parent.read_length()?;
                if len == 0 {
                    break;
                }
                self.parent.read_bytes_into(&mut payload, len)?;
            }
            self.current = Some(Input::new(payload).with_kind(self.parent.kind()));
        }
        self.current
            .as_mut()
            .ok_or_else(|| GraphError::invalid_data("Chunk sequence unavailable"))
    }

    /// Finishes the current sequence.
    ///
    /// Bytes of a sequence that was never loaded are skipped by length
    /// without being copied or decoded.
    pub fn next_chunks(&mut self) -> Result<()> {
        match self.current.take() {
            Some(loaded) => BufferPool::give(loaded.into_buffer()),
            None => loop {
                let len = self.parent.read_length()?;
                if len == 0 {
                    break;
                }
                self.parent.skip(len)?;
            },
        }
        Ok(())
    }
}

impl Drop for InputChunked<'_, '_> {
    fn drop(&mut self) {
        if let Some(loaded) = self.current.take() {
            BufferPool::give(loaded.into_buffer());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_skipping() {
        let mut output = Output::new(512, None);
        output.write_i32(1234).unwrap();
        for value in 1..=5 {
            let mut chunked = OutputChunked::new(&mut output, DEFAULT_CHUNK_SIZE);
            chunked.write_i32(value).unwrap();
            chunked.end_chunks().unwrap();
        }
        output.write_i32(5678).unwrap();
        let written = output.total();

        let mut input = Input::new(output.into_bytes());
        assert_eq!(input.read_i32().unwrap(), 1234);
        {
            let mut chunked = InputChunked::new(&mut input);
            assert_eq!(chunked.chunk().unwrap().read_i32().unwrap(), 1);
            chunked.next_chunks().unwrap();
            chunked.next_chunks().unwrap();
            assert_eq!(chunked.chunk().unwrap().read_i32().unwrap(), 3);
            chunked.next_chunks().unwrap();
            chunked.next_chunks().unwrap();
            assert_eq!(chunked.chunk().unwrap().read_i32().unwrap(), 5);
        }
        assert_eq!(input.read_i32().unwrap(), 5678);
        assert_eq!(input.total(), written);
    }

    #[test]
    fn test_payload_split_across_chunks() {
        let mut output = Output::new(64, None);
        {
            let mut chunked = OutputChunked::new(&mut output, 4);
            chunked.write_bytes(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
            chunked.end_chunks().unwrap();
        }
        assert_eq!(
            output.as_bytes(),
            &[4, 1, 2, 3, 4, 4, 5, 6, 7, 8, 1, 9, 0]
        );

        let mut input = Input::new(output.into_bytes());
        let mut chunked = InputChunked::new(&mut input);
        let bytes = chunked.chunk().unwrap().read_bytes(9).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(chunked.chunk().unwrap().read_byte().unwrap_err().is_buffer_underflow());
    }

    #[test]
    fn test_empty_sequence() {
        let mut output = Output::new(8, None);
        OutputChunked::new(&mut output, 16).end_chunks().unwrap();
        assert_eq!(output.as_bytes(), &[0]);
    }

    #[test]
    fn test_skip_through_stream_source() {
        let mut output = Output::new(64, None);
        {
            let mut chunked = OutputChunked::new(&mut output, 8);
            chunked.write_bytes(&[7; 40]).unwrap();
            chunked.end_chunks().unwrap();
        }
        output.write_i32(99).unwrap();
        let bytes = output.into_bytes();

        let mut input = Input::with_reader(&bytes[..], 16);
        InputChunked::new(&mut input).next_chunks().unwrap();
        assert_eq!(input.read_i32().unwrap(), 99);
    }
}
