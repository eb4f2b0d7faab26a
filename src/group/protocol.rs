//! Group wire protocol
//!
//! Defines the packets exchanged between group members and, for the TCP
//! transport, how they are framed on a stream.
//!
//! # Packets
//!
//! In memory every transport moves [`Packet`]s. A packet is data (source
//! rank, [`Tag`], opaque payload), an abort notice, or a transport's note that
//! a peer's connection has closed.
//!
//! # Message Framing
//!
//! On a stream each frame is a MessagePack-encoded [`FrameHeader`] prefixed
//! with its 4-byte length, followed by the raw payload for data frames:
//!
//! ```text
//! [4 bytes: header length (LE u32)][N bytes: rmp header][payload_len bytes: payload]
//! ```
//!
//! Payload bytes are never MessagePack-encoded so large latency buffers cost
//! exactly their own size on the wire.
//!
//! # Handshake
//!
//! ```text
//! Higher rank                     Lower rank
//!     |                               |
//!     |---- HELLO(rank, version) ---->|
//!     |                               |
//!     |<=========== DATA ============>|
//!     |<----------- ABORT ----------->|
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Both ends of a connection must agree; mismatches are rejected at handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Reject frame headers larger than this
const MAX_HEADER_LEN: usize = 64 * 1024;

/// Reject payloads larger than this (1 GiB)
pub const MAX_PAYLOAD_LEN: u64 = 1024 * 1024 * 1024;

/// Message tag
///
/// User point-to-point traffic and each collective kind use disjoint tags so a
/// collective can never consume a user message or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    User(u32),
    Broadcast,
    Scatter,
    Reduce,
    Barrier,
}

/// Unit of delivery between members
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Data {
        source: usize,
        tag: Tag,
        payload: Vec<u8>,
    },
    Abort {
        source: usize,
        code: i32,
    },
    /// No further packets will arrive from `source`
    Closed {
        source: usize,
    },
}

/// Frame header as written to a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameHeader {
    /// First frame on every connection (connecting side → accepting side)
    Hello { rank: usize, protocol_version: u32 },

    /// Data frame; `payload_len` raw bytes follow the header
    Data { tag: Tag, payload_len: u64 },

    /// Group-wide abort
    Abort { code: i32 },
}

/// Encode a header with its length prefix
pub fn encode_header(header: &FrameHeader) -> Result<Vec<u8>> {
    let header_bytes = rmp_serde::to_vec(header).context("Failed to serialize frame header")?;

    let header_len = header_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + header_bytes.len());
    framed.extend_from_slice(&header_len.to_le_bytes());
    framed.extend_from_slice(&header_bytes);

    Ok(framed)
}

/// Read one frame from a stream
///
/// Returns `Ok(None)` on a clean end of stream before any byte of a new frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<(FrameHeader, Vec<u8>)>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e).context("Failed to read header length"),
    }

    let header_len = u32::from_le_bytes(len_buf) as usize;
    if header_len > MAX_HEADER_LEN {
        anyhow::bail!("Frame header too large: {} bytes", header_len);
    }

    let mut header_buf = vec![0u8; header_len];
    reader.read_exact(&mut header_buf).await.context("Failed to read frame header")?;
    let header: FrameHeader = rmp_serde::from_slice(&header_buf).context("Failed to deserialize frame header")?;

    let payload = match header {
        FrameHeader::Data { payload_len, .. } => {
            if payload_len > MAX_PAYLOAD_LEN {
                anyhow::bail!("Payload too large: {} bytes (max 1GiB)", payload_len);
            }
            let mut payload = vec![0u8; payload_len as usize];
            reader.read_exact(&mut payload).await.context("Failed to read frame payload")?;
            payload
        }
        _ => Vec::new(),
    };

    Ok(Some((header, payload)))
}

/// Write one frame to a stream and flush it
pub async fn write_frame<W>(writer: &mut W, header: &FrameHeader, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = encode_header(header)?;
    writer.write_all(&framed).await.context("Failed to write frame header")?;
    if !payload.is_empty() {
        writer.write_all(payload).await.context("Failed to write frame payload")?;
    }
    writer.flush().await.context("Failed to flush stream")?;
    Ok(())
}

/// Turn a received frame into a packet attributed to `source`
///
/// Hello frames are only valid during connection setup and yield `None`.
pub fn frame_to_packet(source: usize, header: FrameHeader, payload: Vec<u8>) -> Option<Packet> {
    match header {
        FrameHeader::Data { tag, .. } => Some(Packet::Data { source, tag, payload }),
        FrameHeader::Abort { code } => Some(Packet::Abort { source, code }),
        FrameHeader::Hello { .. } => None,
    }
}
