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

//! Variable-length integer codec.
//!
//! Each encoded byte carries 7 bits of payload, least significant group
//! first, with the top bit set on every byte except the last. A 32-bit value
//! needs at most 5 bytes and a 64-bit value at most 10.
//!
//! Values are written unmodified when `optimize_positive` is set. Otherwise
//! they are zig-zag folded first so small negative numbers stay short:
//!
//! | value | optimize_positive | bytes |
//! |------:|:-----------------:|------:|
//! | 63    | false             | 1     |
//! | 64    | false             | 2     |
//! | -64   | false             | 1     |
//! | -65   | false             | 2     |
//! | 127   | true              | 1     |
//! | 128   | true              | 2     |

/// Maximum encoded length of a 32-bit varint.
pub const MAX_VARINT_LEN: usize = 5;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARLONG_LEN: usize = 10;

/// Folds a signed 32-bit value so that small magnitudes map to small codes.
#[inline]
#[must_use]
pub fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag32`].
#[inline]
#[must_use]
pub fn unzigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Folds a signed 64-bit value so that small magnitudes map to small codes.
#[inline]
#[must_use]
pub fn zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag64`].
#[inline]
#[must_use]
pub fn unzigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Encodes `value` into `buf`, returning the number of bytes used.
#[inline]
pub fn encode_u32(mut value: u32, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut len = 0;
    while value >= 0x80 {
        buf[len] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    len + 1
}

/// Encodes `value` into `buf`, returning the number of bytes used.
#[inline]
pub fn encode_u64(mut value: u64, buf: &mut [u8; MAX_VARLONG_LEN]) -> usize {
    let mut len = 0;
    while value >= 0x80 {
        buf[len] = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
        len += 1;
    }
    buf[len] = value as u8;
    len + 1
}

/// Returns the number of bytes `value` occupies as a 32-bit varint.
///
/// # Examples
///
/// ```rust
/// use graphwire::io::varint::varint_length;
///
/// assert_eq!(varint_length(63, false), 1);
/// assert_eq!(varint_length(64, false), 2);
/// assert_eq!(varint_length(-1, true), 5);
/// ```
#[must_use]
pub fn varint_length(value: i32, optimize_positive: bool) -> usize {
    let bits = if optimize_positive {
        value as u32
    } else {
        zigzag32(value)
    };
    unsigned_length(u64::from(bits))
}

/// Returns the number of bytes `value` occupies as a 64-bit varint.
#[must_use]
pub fn varlong_length(value: i64, optimize_positive: bool) -> usize {
    let bits = if optimize_positive {
        value as u64
    } else {
        zigzag64(value)
    };
    unsigned_length(bits)
}

fn unsigned_length(value: u64) -> usize {
    let significant = 64 - value.leading_zeros() as usize;
    significant.max(1).div_ceil(7)
}
