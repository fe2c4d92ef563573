//! Frame buffer
//!
//! Accumulates bytes from a stream until they form complete frames.
//! A single read may hold part of a frame or several pipelined frames.

use std::io::{self, Read};

use bytes::{Buf, BytesMut};

use super::codec::decode_next;
use super::ProtocolValue;
use crate::error::{DecodeError, RelayError, Result};

/// Bytes requested from the socket per read
pub const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Default cap on bytes held for a single unfinished frame (1 GB)
pub const MAX_PENDING: usize = 1024 * 1024 * 1024;

/// Receive buffer that yields one decoded frame at a time
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    max_pending: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::with_limit(MAX_PENDING)
    }

    /// Buffer that rejects an unfinished frame once it holds `max_pending` bytes
    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE.min(max_pending)),
            max_pending,
        }
    }

    /// Append raw bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Perform one read from `reader` into the buffer
    ///
    /// Returns the number of bytes read; 0 means end of stream.
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let n = reader.read(&mut chunk)?;
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Decode the frame at the front of the buffer
    ///
    /// Returns `Ok(None)` while the frame is still incomplete. On success
    /// exactly the bytes of that frame are consumed; on a malformed frame
    /// nothing is consumed. An incomplete frame that already fills the
    /// pending limit counts as malformed.
    pub fn next_frame(&mut self) -> std::result::Result<Option<ProtocolValue>, DecodeError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match decode_next(&self.buffer[..]) {
            Ok((value, consumed)) => {
                self.buffer.advance(consumed);
                Ok(Some(value))
            }
            Err(DecodeError::Incomplete) if self.buffer.len() >= self.max_pending => {
                Err(DecodeError::Malformed(format!(
                    "unfinished frame exceeds {} buffered bytes",
                    self.max_pending
                )))
            }
            Err(DecodeError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Block on `reader` until a full frame is buffered
    ///
    /// Returns `Ok(None)` if the peer closed the stream cleanly between
    /// frames.
    pub fn read_frame<R: Read>(&mut self, reader: &mut R) -> Result<Option<ProtocolValue>> {
        loop {
            if let Some(frame) = self.next_frame()? {
                return Ok(Some(frame));
            }

            match self.read_from(reader) {
                Ok(0) if self.buffer.is_empty() => return Ok(None),
                Ok(0) => {
                    return Err(RelayError::Network(
                        "connection closed in the middle of a frame".to_string(),
                    ))
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Drop everything buffered, returning how many bytes were discarded
    pub fn discard_pending(&mut self) -> usize {
        let n = self.buffer.len();
        self.buffer.clear();
        n
    }

    /// Number of buffered bytes not yet decoded
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
