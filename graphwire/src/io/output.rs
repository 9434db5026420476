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

//! Write side of the wire buffer.

use super::BufferKind;
use super::varint::{self, MAX_VARINT_LEN, MAX_VARLONG_LEN};
use crate::error::{ErrorKind, GraphError, Result};
use std::fmt;
use std::io::Write;

/// Smallest buffer a stream-backed output will use; every fixed-width write
/// and every varint must fit after a flush.
const MIN_STREAM_BUFFER: usize = 16;

/// A byte-oriented write cursor.
///
/// An `Output` either accumulates bytes in memory, growing up to an optional
/// maximum size, or buffers them in front of a [`Write`] sink and flushes each
/// time the buffer fills.
///
/// # Examples
///
/// ```rust
/// use graphwire::io::Output;
///
/// # fn example() -> graphwire::Result<()> {
/// let mut output = Output::new(16, None);
/// output.write_varint(300, true)?;
/// output.write_string(Some("hi"))?;
/// assert_eq!(output.as_bytes(), &[0xAC, 0x02, 0x03, b'h', b'i']);
/// # Ok(())
/// # }
/// ```
pub struct Output<'s> {
    buffer: Vec<u8>,
    capacity: usize,
    max_capacity: Option<usize>,
    flushed: u64,
    kind: BufferKind,
    sink: Option<Box<dyn Write + 's>>,
}

impl Output<'static> {
    /// Creates an in-memory output.
    ///
    /// `max_buffer_size` caps growth; `None` allows unbounded growth. Writes
    /// that would grow past the cap fail with
    /// [`ErrorKind::BufferOverflow`].
    #[must_use]
    pub fn new(buffer_size: usize, max_buffer_size: Option<usize>) -> Self {
        let capacity = match max_buffer_size {
            Some(max) => buffer_size.min(max),
            None => buffer_size,
        };
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            max_capacity: max_buffer_size,
            flushed: 0,
            kind: BufferKind::Checked,
            sink: None,
        }
    }

    /// Creates an unbounded in-memory output around an existing allocation.
    pub(crate) fn from_vec(mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        let capacity = buffer.capacity();
        Self {
            buffer,
            capacity,
            max_capacity: None,
            flushed: 0,
            kind: BufferKind::Checked,
            sink: None,
        }
    }
}

impl<'s> Output<'s> {
    /// Creates an output that flushes to `writer` whenever `buffer_size`
    /// bytes have accumulated.
    pub fn with_writer(writer: impl Write + 's, buffer_size: usize) -> Self {
        let capacity = buffer_size.max(MIN_STREAM_BUFFER);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            max_capacity: Some(capacity),
            flushed: 0,
            kind: BufferKind::Checked,
            sink: Some(Box::new(writer)),
        }
    }

    /// Selects the bulk encoding strategy.
    #[must_use]
    pub fn with_kind(mut self, kind: BufferKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the bulk encoding strategy.
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Returns `true` when int and long values are varint encoded.
    #[must_use]
    pub fn varints_enabled(&self) -> bool {
        self.kind == BufferKind::Checked
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes written, including bytes already flushed to the sink.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.flushed + self.buffer.len() as u64
    }

    /// Current buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can be written before the buffer must flush or grow.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// The buffered bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Copies the buffered bytes into a new vector.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffer.clone()
    }

    /// Consumes the output and returns the buffered bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Discards buffered bytes and resets the running total.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.flushed = 0;
    }

    pub(crate) fn take_buffer(&mut self) -> Vec<u8> {
        self.capacity = 0;
        std::mem::take(&mut self.buffer)
    }

    /// Pushes buffered bytes to the sink.
    ///
    /// In-memory outputs have no sink and keep their bytes.
    pub fn flush(&mut self) -> Result<()> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        if !self.buffer.is_empty() {
            sink.write_all(&self.buffer)?;
            self.flushed += self.buffer.len() as u64;
            self.buffer.clear();
        }
        sink.flush()?;
        Ok(())
    }

    /// Ensures `required` bytes can be written, flushing or growing as needed.
    fn require(&mut self, required: usize) -> Result<()> {
        if self.remaining() >= required {
            return Ok(());
        }
        let max = self.max_capacity.unwrap_or(usize::MAX);
        if required > max {
            return Err(overflow(max, required));
        }
        self.flush()?;
        while self.remaining() < required {
            if self.capacity == max {
                return Err(overflow(max, required));
            }
            self.capacity = self.capacity.saturating_mul(2).max(1).min(max);
        }
        self.buffer.reserve(self.capacity - self.buffer.len());
        Ok(())
    }

    /// Writes one byte.
    pub fn write_byte(&mut self, value: u8) -> Result<()> {
        self.require(1)?;
        self.buffer.push(value);
        Ok(())
    }

    /// Writes raw bytes, flushing in pieces when the buffer is smaller than
    /// the slice.
    pub fn write_bytes(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let step = if self.remaining() > 0 {
                self.remaining().min(bytes.len())
            } else {
                let want = match self.max_capacity {
                    Some(max) => bytes.len().min(max),
                    None => bytes.len(),
                };
                self.require(want)?;
                want
            };
            self.buffer.extend_from_slice(&bytes[..step]);
            bytes = &bytes[step..];
        }
        Ok(())
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_byte(value as u8)
    }

    /// Writes a boolean as one byte.
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_byte(u8::from(value))
    }

    /// Writes a 2-byte big-endian short.
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_fixed(&value.to_be_bytes())
    }

    /// Writes a 2-byte big-endian UTF-16 code unit.
    pub fn write_char(&mut self, value: u16) -> Result<()> {
        self.write_fixed(&value.to_be_bytes())
    }

    /// Writes a 4-byte big-endian int.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_fixed(&value.to_be_bytes())
    }

    /// Writes an 8-byte big-endian long.
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_fixed(&value.to_be_bytes())
    }

    /// Writes a 4-byte big-endian IEEE-754 float.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_fixed(&value.to_bits().to_be_bytes())
    }

    /// Writes an 8-byte big-endian IEEE-754 double.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_fixed(&value.to_bits().to_be_bytes())
    }

    fn write_fixed(&mut self, bytes: &[u8]) -> Result<()> {
        self.require(bytes.len())?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes a 32-bit varint and returns the number of bytes written.
    ///
    /// With `optimize_positive` unset the value is zig-zag folded first.
    pub fn write_varint(&mut self, value: i32, optimize_positive: bool) -> Result<usize> {
        let bits = if optimize_positive {
            value as u32
        } else {
            varint::zigzag32(value)
        };
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let len = varint::encode_u32(bits, &mut scratch);
        self.write_fixed(&scratch[..len])?;
        Ok(len)
    }

    /// Writes a 64-bit varint and returns the number of bytes written.
    pub fn write_varlong(&mut self, value: i64, optimize_positive: bool) -> Result<usize> {
        let bits = if optimize_positive {
            value as u64
        } else {
            varint::zigzag64(value)
        };
        let mut scratch = [0u8; MAX_VARLONG_LEN];
        let len = varint::encode_u64(bits, &mut scratch);
        self.write_fixed(&scratch[..len])?;
        Ok(len)
    }

    /// Writes an int as a varint when varints are enabled, otherwise fixed.
    pub fn write_int(&mut self, value: i32, optimize_positive: bool) -> Result<()> {
        if self.varints_enabled() {
            self.write_varint(value, optimize_positive).map(drop)
        } else {
            self.write_i32(value)
        }
    }

    /// Writes a long as a varint when varints are enabled, otherwise fixed.
    pub fn write_long(&mut self, value: i64, optimize_positive: bool) -> Result<()> {
        if self.varints_enabled() {
            self.write_varlong(value, optimize_positive).map(drop)
        } else {
            self.write_i64(value)
        }
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// The length is written as `varint(len + 1)` so that `0` encodes `None`.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.write_byte(0),
            Some(s) => {
                let len = i32::try_from(s.len() + 1).map_err(|_| {
                    GraphError::invalid_argument(format!("String too long: {} bytes", s.len()))
                })?;
                self.write_varint(len, true)?;
                self.write_bytes(s.as_bytes())
            }
        }
    }

    /// Writes a run of ints; varints in checked mode, native order in direct mode.
    pub fn write_i32s(&mut self, values: &[i32], optimize_positive: bool) -> Result<()> {
        match self.kind {
            BufferKind::Checked => {
                for &value in values {
                    self.write_varint(value, optimize_positive)?;
                }
                Ok(())
            }
            BufferKind::Direct => {
                for &value in values {
                    self.write_fixed(&value.to_ne_bytes())?;
                }
                Ok(())
            }
        }
    }

    /// Writes a run of longs; varints in checked mode, native order in direct mode.
    pub fn write_i64s(&mut self, values: &[i64], optimize_positive: bool) -> Result<()> {
        match self.kind {
            BufferKind::Checked => {
                for &value in values {
                    self.write_varlong(value, optimize_positive)?;
                }
                Ok(())
            }
            BufferKind::Direct => {
                for &value in values {
                    self.write_fixed(&value.to_ne_bytes())?;
                }
                Ok(())
            }
        }
    }

    /// Writes a run of shorts.
    pub fn write_i16s(&mut self, values: &[i16]) -> Result<()> {
        for &value in values {
            match self.kind {
                BufferKind::Checked => self.write_fixed(&value.to_be_bytes())?,
                BufferKind::Direct => self.write_fixed(&value.to_ne_bytes())?,
            }
        }
        Ok(())
    }

    /// Writes a run of UTF-16 code units.
    pub fn write_chars(&mut self, values: &[u16]) -> Result<()> {
        for &value in values {
            match self.kind {
                BufferKind::Checked => self.write_fixed(&value.to_be_bytes())?,
                BufferKind::Direct => self.write_fixed(&value.to_ne_bytes())?,
            }
        }
        Ok(())
    }

    /// Writes a run of floats.
    pub fn write_f32s(&mut self, values: &[f32]) -> Result<()> {
        for &value in values {
            match self.kind {
                BufferKind::Checked => self.write_fixed(&value.to_bits().to_be_bytes())?,
                BufferKind::Direct => self.write_fixed(&value.to_bits().to_ne_bytes())?,
            }
        }
        Ok(())
    }

    /// Writes a run of doubles.
    pub fn write_f64s(&mut self, values: &[f64]) -> Result<()> {
        for &value in values {
            match self.kind {
                BufferKind::Checked => self.write_fixed(&value.to_bits().to_be_bytes())?,
                BufferKind::Direct => self.write_fixed(&value.to_bits().to_ne_bytes())?,
            }
        }
        Ok(())
    }

    /// Writes a run of booleans, one byte each.
    pub fn write_bools(&mut self, values: &[bool]) -> Result<()> {
        for &value in values {
            self.write_bool(value)?;
        }
        Ok(())
    }
}

fn overflow(max_capacity: usize, required: usize) -> GraphError {
    GraphError::new(ErrorKind::BufferOverflow {
        max_capacity,
        required,
    })
}

impl Default for Output<'static> {
    fn default() -> Self {
        Self::new(256, None)
    }
}

impl fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("position", &self.buffer.len())
            .field("capacity", &self.capacity)
            .field("max_capacity", &self.max_capacity)
            .field("total", &self.total())
            .field("kind", &self.kind)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}
