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

//! Read side of the wire buffer.

use super::BufferKind;
use super::varint;
use crate::error::{ErrorKind, GraphError, Result};
use std::fmt;
use std::io::{self, Read};

const MIN_STREAM_BUFFER: usize = 16;

/// A byte-oriented read cursor.
///
/// An `Input` reads either from bytes held in memory or from a [`Read`]
/// source that is pulled into an internal buffer on demand. Asking for more
/// bytes than the source can deliver fails with
/// [`ErrorKind::BufferUnderflow`].
///
/// # Examples
///
/// ```rust
/// use graphwire::io::Input;
///
/// # fn example() -> graphwire::Result<()> {
/// let mut input = Input::new(vec![0xAC, 0x02, 0x03, b'h', b'i']);
/// assert_eq!(input.read_varint(true)?, 300);
/// assert_eq!(input.read_string()?.as_deref(), Some("hi"));
/// assert!(input.eof()?);
/// # Ok(())
/// # }
/// ```
pub struct Input<'s> {
    buffer: Vec<u8>,
    position: usize,
    capacity: usize,
    consumed: u64,
    kind: BufferKind,
    source: Option<Box<dyn Read + 's>>,
}

impl Input<'static> {
    /// Creates an input over bytes held in memory.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let buffer = bytes.into();
        Self {
            capacity: buffer.len(),
            buffer,
            position: 0,
            consumed: 0,
            kind: BufferKind::Checked,
            source: None,
        }
    }
}

impl<'s> Input<'s> {
    /// Creates an input that refills from `reader` in blocks of up to
    /// `buffer_size` bytes.
    pub fn with_reader(reader: impl Read + 's, buffer_size: usize) -> Self {
        let capacity = buffer_size.max(MIN_STREAM_BUFFER);
        Self {
            buffer: Vec::with_capacity(capacity),
            position: 0,
            capacity,
            consumed: 0,
            kind: BufferKind::Checked,
            source: Some(Box::new(reader)),
        }
    }

    /// Selects the bulk decoding strategy. Must match the writer's.
    #[must_use]
    pub fn with_kind(mut self, kind: BufferKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the bulk decoding strategy.
    #[must_use]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Returns `true` when int and long values are varint encoded.
    #[must_use]
    pub fn varints_enabled(&self) -> bool {
        self.kind == BufferKind::Checked
    }

    /// Read position within the current buffer.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total bytes consumed since creation or the last [`rewind`](Self::rewind).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.consumed + self.position as u64
    }

    /// Bytes buffered and not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Moves the cursor back to the start of the buffered bytes.
    pub fn rewind(&mut self) {
        self.position = 0;
        self.consumed = 0;
    }

    /// Returns `true` when no further bytes can be read.
    pub fn eof(&mut self) -> Result<bool> {
        Ok(self.fill(1)? == 0)
    }

    pub(crate) fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Tries to make `required` bytes available, returning how many are.
    fn fill(&mut self, required: usize) -> Result<usize> {
        let available = self.remaining();
        if available >= required {
            return Ok(available);
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(available);
        };
        if self.position > 0 {
            self.buffer.drain(..self.position);
            self.consumed += self.position as u64;
            self.position = 0;
        }
        let target = self.capacity.max(required);
        let mut filled = self.buffer.len();
        self.buffer.resize(target, 0);
        while filled < required {
            match source.read(&mut self.buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(filled);
                    return Err(e.into());
                }
            }
        }
        self.buffer.truncate(filled);
        Ok(filled)
    }

    fn require(&mut self, required: usize) -> Result<()> {
        let available = self.fill(required)?;
        if available < required {
            return Err(GraphError::new(ErrorKind::BufferUnderflow {
                required,
                available,
            }));
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.require(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(bytes)
    }

    /// Reads one byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.require(1)?;
        let byte = self.buffer[self.position];
        self.position += 1;
        Ok(byte)
    }

    /// Fills `dest` completely.
    pub fn read_exact(&mut self, dest: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < dest.len() {
            let want = (dest.len() - offset).min(self.capacity.max(1));
            self.require(want)?;
            dest[offset..offset + want]
                .copy_from_slice(&self.buffer[self.position..self.position + want]);
            self.position += want;
            offset += want;
        }
        Ok(())
    }

    /// Reads `count` bytes into a new vector.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.read_bytes_into(&mut bytes, count)?;
        Ok(bytes)
    }

    /// Appends `count` bytes to `dest`.
    ///
    /// `dest` grows one buffer's worth at a time, so a corrupt length fails
    /// with an underflow once the source runs dry instead of allocating it all.
    pub fn read_bytes_into(&mut self, dest: &mut Vec<u8>, mut count: usize) -> Result<()> {
        while count > 0 {
            let step = count.min(self.capacity.max(16));
            let start = dest.len();
            dest.resize(start + step, 0);
            self.read_exact(&mut dest[start..])?;
            count -= step;
        }
        Ok(())
    }

    /// Discards `count` bytes without decoding them.
    pub fn skip(&mut self, mut count: usize) -> Result<()> {
        while count > 0 {
            let step = count.min(self.capacity.max(1));
            self.require(step)?;
            self.position += step;
            count -= step;
        }
        Ok(())
    }

    /// Reads a signed byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_byte().map(|b| b as i8)
    }

    /// Reads a one-byte boolean.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    /// Reads a 2-byte big-endian short.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.take::<2>().map(i16::from_be_bytes)
    }

    /// Reads a 2-byte big-endian UTF-16 code unit.
    pub fn read_char(&mut self) -> Result<u16> {
        self.take::<2>().map(u16::from_be_bytes)
    }

    /// Reads a 4-byte big-endian int.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.take::<4>().map(i32::from_be_bytes)
    }

    /// Reads an 8-byte big-endian long.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.take::<8>().map(i64::from_be_bytes)
    }

    /// Reads a 4-byte big-endian float.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.take::<4>().map(|b| f32::from_bits(u32::from_be_bytes(b)))
    }

    /// Reads an 8-byte big-endian double.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.take::<8>().map(|b| f64::from_bits(u64::from_be_bytes(b)))
    }

    /// Reads a 32-bit varint.
    pub fn read_varint(&mut self, optimize_positive: bool) -> Result<i32> {
        let mut result: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_byte()?;
            result |= u32::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(if optimize_positive {
                    result as i32
                } else {
                    varint::unzigzag32(result)
                });
            }
        }
        Err(GraphError::invalid_data("Malformed varint"))
    }

    /// Reads a 64-bit varint.
    pub fn read_varlong(&mut self, optimize_positive: bool) -> Result<i64> {
        let mut result: u64 = 0;
        for shift in (0..70).step_by(7) {
            let byte = self.read_byte()?;
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(if optimize_positive {
                    result as i64
                } else {
                    varint::unzigzag64(result)
                });
            }
        }
        Err(GraphError::invalid_data("Malformed varlong"))
    }

    /// Reads an int written by [`Output::write_int`](super::Output::write_int).
    pub fn read_int(&mut self, optimize_positive: bool) -> Result<i32> {
        if self.varints_enabled() {
            self.read_varint(optimize_positive)
        } else {
            self.read_i32()
        }
    }

    /// Reads a long written by [`Output::write_long`](super::Output::write_long).
    pub fn read_long(&mut self, optimize_positive: bool) -> Result<i64> {
        if self.varints_enabled() {
            self.read_varlong(optimize_positive)
        } else {
            self.read_i64()
        }
    }

    /// Reads a varint that must be a non-negative length or count.
    pub fn read_length(&mut self) -> Result<usize> {
        let value = self.read_varint(true)?;
        usize::try_from(value)
            .map_err(|_| GraphError::invalid_data(format!("Negative length: {value}")))
    }

    /// Reads a length-prefixed UTF-8 string; `None` for the null marker.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let len = self.read_length()?;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.read_bytes(len - 1)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| GraphError::invalid_data(format!("String is not UTF-8: {e}")))
    }

    /// Reads `count` ints written by [`Output::write_i32s`](super::Output::write_i32s).
    pub fn read_i32s(&mut self, count: usize, optimize_positive: bool) -> Result<Vec<i32>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            values.push(match self.kind {
                BufferKind::Checked => self.read_varint(optimize_positive)?,
                BufferKind::Direct => i32::from_ne_bytes(self.take::<4>()?),
            });
        }
        Ok(values)
    }

    /// Reads `count` longs written by [`Output::write_i64s`](super::Output::write_i64s).
    pub fn read_i64s(&mut self, count: usize, optimize_positive: bool) -> Result<Vec<i64>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            values.push(match self.kind {
                BufferKind::Checked => self.read_varlong(optimize_positive)?,
                BufferKind::Direct => i64::from_ne_bytes(self.take::<8>()?),
            });
        }
        Ok(values)
    }

    /// Reads `count` shorts.
    pub fn read_i16s(&mut self, count: usize) -> Result<Vec<i16>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            let bytes = self.take::<2>()?;
            values.push(match self.kind {
                BufferKind::Checked => i16::from_be_bytes(bytes),
                BufferKind::Direct => i16::from_ne_bytes(bytes),
            });
        }
        Ok(values)
    }

    /// Reads `count` UTF-16 code units.
    pub fn read_chars(&mut self, count: usize) -> Result<Vec<u16>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            let bytes = self.take::<2>()?;
            values.push(match self.kind {
                BufferKind::Checked => u16::from_be_bytes(bytes),
                BufferKind::Direct => u16::from_ne_bytes(bytes),
            });
        }
        Ok(values)
    }

    /// Reads `count` floats.
    pub fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            let bytes = self.take::<4>()?;
            values.push(f32::from_bits(match self.kind {
                BufferKind::Checked => u32::from_be_bytes(bytes),
                BufferKind::Direct => u32::from_ne_bytes(bytes),
            }));
        }
        Ok(values)
    }

    /// Reads `count` doubles.
    pub fn read_f64s(&mut self, count: usize) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            let bytes = self.take::<8>()?;
            values.push(f64::from_bits(match self.kind {
                BufferKind::Checked => u64::from_be_bytes(bytes),
                BufferKind::Direct => u64::from_ne_bytes(bytes),
            }));
        }
        Ok(values)
    }

    /// Reads `count` one-byte booleans.
    pub fn read_bools(&mut self, count: usize) -> Result<Vec<bool>> {
        let mut values = Vec::with_capacity(count.min(self.capacity.max(16)));
        for _ in 0..count {
            values.push(self.read_bool()?);
        }
        Ok(values)
    }
}

impl fmt::Debug for Input<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("position", &self.position)
            .field("limit", &self.buffer.len())
            .field("total", &self.total())
            .field("kind", &self.kind)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Output;

    #[test]
    fn test_read_fixed_width() {
        let mut output = Output::new(32, None);
        output.write_i16(-2).unwrap();
        output.write_char(0x263A).unwrap();
        output.write_i32(-123_456).unwrap();
        output.write_i64(i64::MAX).unwrap();
        output.write_f32(1.5).unwrap();
        output.write_f64(-0.25).unwrap();
        output.write_bool(true).unwrap();

        let mut input = Input::new(output.into_bytes());
        assert_eq!(input.read_i16().unwrap(), -2);
        assert_eq!(input.read_char().unwrap(), 0x263A);
        assert_eq!(input.read_i32().unwrap(), -123_456);
        assert_eq!(input.read_i64().unwrap(), i64::MAX);
        assert_eq!(input.read_f32().unwrap(), 1.5);
        assert_eq!(input.read_f64().unwrap(), -0.25);
        assert!(input.read_bool().unwrap());
        assert!(input.eof().unwrap());
    }

    #[test]
    fn test_underflow_is_distinct() {
        let mut input = Input::new(vec![1, 2]);
        let err = input.read_i32().unwrap_err();
        assert!(err.is_buffer_underflow());
    }

    #[test]
    fn test_stream_refill() {
        let bytes: Vec<u8> = (0..100u8).collect();
        let mut input = Input::with_reader(&bytes[..], 16);
        let first = input.read_bytes(40).unwrap();
        assert_eq!(first, (0..40u8).collect::<Vec<_>>());
        input.skip(50).unwrap();
        assert_eq!(input.read_byte().unwrap(), 90);
        assert_eq!(input.total(), 91);
        assert!(input.read_bytes(10).is_err());
    }

    #[test]
    fn test_varint_round_trip_boundaries() {
        let values = [0, 63, 64, 8191, 8192, 2_097_151, -64, -65, i32::MIN, i32::MAX];
        let mut output = Output::new(64, None);
        for value in values {
            output.write_varint(value, false).unwrap();
            output.write_varint(value, true).unwrap();
        }
        let mut input = Input::new(output.into_bytes());
        for value in values {
            assert_eq!(input.read_varint(false).unwrap(), value);
            assert_eq!(input.read_varint(true).unwrap(), value);
        }
    }

    #[test]
    fn test_varlong_round_trip() {
        let values = [0i64, -1, 1 << 40, i64::MIN, i64::MAX];
        let mut output = Output::new(64, None);
        for value in values {
            output.write_varlong(value, false).unwrap();
        }
        let mut input = Input::new(output.into_bytes());
        for value in values {
            assert_eq!(input.read_varlong(false).unwrap(), value);
        }
    }

    #[test]
    fn test_corrupt_string_length_underflows() {
        let mut input = Input::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07, b'a']);
        assert!(input.read_string().unwrap_err().is_buffer_underflow());

        let source: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x07, b'a', b'b'];
        let mut input = Input::with_reader(source, 64);
        assert!(input.read_string().unwrap_err().is_buffer_underflow());
    }

    #[test]
    fn test_malformed_varint() {
        let mut input = Input::new(vec![0xFF; 6]);
        assert!(input.read_varint(true).is_err());
    }

    #[test]
    fn test_bulk_paths_per_kind() {
        for kind in [BufferKind::Checked, BufferKind::Direct] {
            let mut output = Output::new(8, None).with_kind(kind);
            output.write_i32s(&[1, -2, 300], false).unwrap();
            output.write_f64s(&[0.5, 2.0]).unwrap();
            output.write_chars(&[65, 66]).unwrap();
            let mut input = Input::new(output.into_bytes()).with_kind(kind);
            assert_eq!(input.read_i32s(3, false).unwrap(), vec![1, -2, 300]);
            assert_eq!(input.read_f64s(2).unwrap(), vec![0.5, 2.0]);
            assert_eq!(input.read_chars(2).unwrap(), vec![65, 66]);
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let mut input = Input::new(vec![3, 0xFF, 0xFE]);
        assert!(input.read_string().is_err());
    }
}
