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

//! Length-prefixed framing of object graphs over async streams.
//!
//! Each graph is written as a 4-byte big-endian length followed by the bytes
//! produced by [`Engine::to_bytes`].
//!
//! ```text
//! +------------------+-------------------+
//! | Length (4 bytes) | Payload (N bytes) |
//! +------------------+-------------------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use graphwire::framing::{read_frame, write_frame};
//!
//! # async fn example() -> graphwire::Result<()> {
//! let mut buffer = Vec::new();
//! write_frame(&mut buffer, b"Hello").await?;
//! assert_eq!(&buffer[..4], &5u32.to_be_bytes());
//!
//! let mut reader = &buffer[..];
//! assert_eq!(read_frame(&mut reader).await?, b"Hello");
//! # Ok(())
//! # }
//! ```

use crate::buffer_pool::BufferPool;
use crate::engine::Engine;
use crate::error::{GraphError, Result};
use crate::model::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum frame size (16 MB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Writes a length-prefixed frame and flushes the writer.
///
/// # Errors
///
/// Fails when the payload exceeds [`MAX_FRAME_SIZE`] or the writer fails.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            GraphError::invalid_argument(format!(
                "Frame size {} exceeds maximum allowed size {}",
                payload.len(),
                MAX_FRAME_SIZE
            ))
        })?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_length<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut len_bytes).await?;

    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_SIZE {
        return Err(GraphError::invalid_data(format!(
            "Frame size {} exceeds maximum allowed size {}",
            len, MAX_FRAME_SIZE
        )));
    }
    Ok(len as usize)
}

/// Reads one length-prefixed frame.
///
/// # Errors
///
/// Fails when the announced length exceeds [`MAX_FRAME_SIZE`] or the stream
/// ends before the frame is complete.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let len = read_length(reader).await?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Serializes `value` with `engine` and writes it as one frame.
///
/// # Errors
///
/// Fails when serialization or framing fails.
pub async fn write_graph<W>(writer: &mut W, engine: &mut Engine, value: &Value) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = engine.to_bytes(value)?;
    write_frame(writer, &payload).await
}

/// Reads one frame and deserializes it with `engine`.
///
/// # Errors
///
/// Fails when framing fails or the payload is not a valid graph.
pub async fn read_graph<R>(reader: &mut R, engine: &mut Engine) -> Result<Value>
where
    R: AsyncRead + Unpin,
{
    let len = read_length(reader).await?;
    // Only needed while decoding; goes back to the pool on drop.
    let mut payload = BufferPool::get(len);
    payload.resize(len);
    reader.read_exact(&mut payload).await?;
    engine.from_bytes(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Class;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"graph").await.unwrap();
        assert_eq!(buffer.len(), FRAME_HEADER_SIZE + 5);

        let mut reader = &buffer[..];
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"graph");
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &[]).await.unwrap();
        assert_eq!(buffer, vec![0, 0, 0, 0]);

        let mut reader = &buffer[..];
        assert!(read_frame(&mut reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut data = Vec::new();
        data.extend_from_slice(&(MAX_FRAME_SIZE + 1).to_be_bytes());
        let mut reader = &data[..];
        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u32.to_be_bytes());
        data.extend_from_slice(b"short");
        let mut reader = &data[..];
        assert!(read_frame(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn test_read_graph_returns_buffer_to_pool() {
        // 300 KB lands in the 1 MB size class, which nothing else here uses.
        let value = Value::string(&"x".repeat(300_000));
        let mut buffer = Vec::new();
        write_graph(&mut buffer, &mut Engine::new(), &value).await.unwrap();

        let mut reader = &buffer[..];
        let back = read_graph(&mut reader, &mut Engine::new()).await.unwrap();
        assert_eq!(back, value);

        let pooled = BufferPool::stats()
            .into_iter()
            .find(|(size, _)| *size == 1024 * 1024)
            .map(|(_, count)| count);
        assert!(pooled.unwrap_or(0) >= 1);
    }

    #[tokio::test]
    async fn test_graphs_over_duplex() {
        let list = Class::builder("demo.List").collection().build();
        let value = Value::object(&list);
        value.as_object().unwrap().borrow_mut().push("one").unwrap();
        value.as_object().unwrap().borrow_mut().push(2).unwrap();

        let (mut client, mut server) = tokio::io::duplex(1024);
        let mut writer = Engine::new();
        writer.register(&list);
        write_graph(&mut client, &mut writer, &value).await.unwrap();
        write_graph(&mut client, &mut writer, &Value::Int(7)).await.unwrap();

        let mut reader = Engine::new();
        reader.register(&list);
        assert_eq!(read_graph(&mut server, &mut reader).await.unwrap(), value);
        assert_eq!(read_graph(&mut server, &mut reader).await.unwrap(), Value::Int(7));
    }
}
