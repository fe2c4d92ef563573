//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufWriter, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::protocol::{encode_value, Command, FrameBuffer};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader
    reader: TcpStream,

    /// TCP stream writer (buffered so pipelined replies go out together)
    writer: BufWriter<TcpStream>,

    /// Bytes received but not yet decoded
    buffer: FrameBuffer,

    /// Shared command dispatcher
    dispatcher: Arc<Dispatcher>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: read_stream,
            writer: BufWriter::new(write_stream),
            buffer: FrameBuffer::new(),
            dispatcher,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 leaves the timeout unset)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads bytes in a loop and answers every complete request in the
    /// buffer, in order. Returns when the client disconnects or an error
    /// occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            match self.buffer.read_from(&mut self.reader) {
                Ok(0) => {
                    // Client disconnected gracefully
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Ok(n) => {
                    tracing::trace!("Read {} bytes from {}", n, self.peer_addr);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(ref e) if is_disconnect(e) => {
                    tracing::debug!("Connection to client {} lost: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(ref e) if is_timeout(e) => {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e.into());
                }
            }

            if let Err(e) = self.answer_buffered() {
                // If the client disconnected before we could send the response,
                // log and exit gracefully rather than treating it as a server error.
                if is_disconnect(&e) {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e.into());
            }
        }
    }

    /// Dispatch every complete frame in the buffer and flush the replies
    fn answer_buffered(&mut self) -> io::Result<()> {
        loop {
            let command = match self.buffer.next_frame() {
                Ok(Some(frame)) => Command::from_frame(frame),
                Ok(None) => break,
                Err(e) => {
                    let dropped = self.buffer.discard_pending();
                    tracing::debug!(
                        "Malformed request from {} ({}), discarded {} bytes",
                        self.peer_addr,
                        e,
                        dropped
                    );
                    Command::invalid()
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let reply = self.dispatcher.dispatch(&command);
            self.writer.write_all(&encode_value(&reply))?;
        }

        self.writer.flush()
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

// Windows reports TimedOut where Unix reports WouldBlock
fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
