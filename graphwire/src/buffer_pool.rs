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

//! Pooled byte buffers.
//!
//! Chunk framing allocates a scratch buffer for every framed field, and frame
//! reads allocate one per graph. Both draw from this process-wide pool, which
//! keeps a bounded number of cleared buffers per size class.
//!
//! # Example
//!
//! ```rust
//! use graphwire::buffer_pool::BufferPool;
//!
//! let mut buffer = BufferPool::get(1024);
//! buffer.extend_from_slice(b"payload");
//! assert!(buffer.capacity() >= 1024);
//! // Returned to the pool on drop.
//! ```

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

/// Buffers larger than this are dropped instead of pooled.
const MAX_POOLED_SIZE: usize = 1024 * 1024;

/// Buffers kept per size class.
const MAX_BUFFERS_PER_CLASS: usize = 32;

const SIZE_CLASSES: &[usize] = &[
    256,     // 256 B
    1024,    // 1 KB
    4096,    // 4 KB
    16384,   // 16 KB
    65536,   // 64 KB
    262144,  // 256 KB
    1048576, // 1 MB
];

/// A pooled buffer that goes back to the pool when dropped.
pub struct PooledBuffer {
    buffer: Vec<u8>,
}

impl PooledBuffer {
    /// Returns the capacity of the buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Resizes the buffer to `new_len`, zero filling.
    pub fn resize(&mut self, new_len: usize) {
        self.buffer.resize(new_len, 0);
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl From<PooledBuffer> for Vec<u8> {
    fn from(mut buffer: PooledBuffer) -> Self {
        // Taking the vector leaves capacity 0, which Drop does not pool.
        std::mem::take(&mut buffer.buffer)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        BufferPool::give(std::mem::take(&mut self.buffer));
    }
}

struct Pools {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
}

impl Pools {
    fn new() -> Self {
        Self {
            classes: SIZE_CLASSES.iter().map(|_| Mutex::new(Vec::new())).collect(),
        }
    }
}

/// Process-wide pool of byte buffers.
pub struct BufferPool;

impl BufferPool {
    fn pools() -> &'static Pools {
        static INSTANCE: OnceLock<Pools> = OnceLock::new();
        INSTANCE.get_or_init(Pools::new)
    }

    /// Takes an empty vector with at least `min_capacity` bytes of capacity.
    #[must_use]
    pub fn take(min_capacity: usize) -> Vec<u8> {
        match SIZE_CLASSES.iter().position(|&size| size >= min_capacity) {
            Some(idx) => {
                if let Some(mut buffer) = Self::pools().classes[idx].lock().pop() {
                    buffer.clear();
                    return buffer;
                }
                Vec::with_capacity(SIZE_CLASSES[idx])
            }
            None => Vec::with_capacity(min_capacity),
        }
    }

    /// Returns a vector to the pool. Empty-capacity and oversized vectors are dropped.
    pub fn give(buffer: Vec<u8>) {
        let capacity = buffer.capacity();
        if capacity == 0 || capacity > MAX_POOLED_SIZE {
            return;
        }
        // A buffer serves requests up to the largest class it fully covers.
        if let Some(idx) = SIZE_CLASSES.iter().rposition(|&size| size <= capacity) {
            let mut pool = Self::pools().classes[idx].lock();
            if pool.len() < MAX_BUFFERS_PER_CLASS {
                pool.push(buffer);
            }
        }
    }

    /// Takes a buffer wrapped in a guard that gives it back on drop.
    #[must_use]
    pub fn get(min_capacity: usize) -> PooledBuffer {
        PooledBuffer {
            buffer: Self::take(min_capacity),
        }
    }

    /// Returns `(size_class, pooled_count)` for every size class.
    #[must_use]
    pub fn stats() -> Vec<(usize, usize)> {
        SIZE_CLASSES
            .iter()
            .zip(Self::pools().classes.iter())
            .map(|(size, pool)| (*size, pool.lock().len()))
            .collect()
    }
}
