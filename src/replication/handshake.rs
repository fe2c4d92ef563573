//! Replica → master handshake
//!
//! Sequential, blocking exchange on a dedicated connection:
//!
//! ```text
//! NotStarted ──PING──▶ SentPing ──REPLCONF listening-port──▶ SentListeningPort
//!     ──REPLCONF capa psync2──▶ SentCapabilities ──▶ AwaitingFullResync
//! ```
//!
//! Every reply is read and validated before the next step is sent. Each
//! read and write is bounded by the step timeout.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::ReplicaOf;
use crate::error::HandshakeError;
use crate::protocol::{Command, FrameBuffer, ProtocolValue};

/// Progress of the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    NotStarted,
    SentPing,
    SentListeningPort,
    SentCapabilities,
    /// Handshake done; PSYNC and the resync payload are not implemented
    AwaitingFullResync,
}

/// Open connection to the master after a successful handshake
///
/// This is where PSYNC and the replication stream would continue.
#[derive(Debug)]
pub struct MasterLink {
    master: ReplicaOf,
    stream: TcpStream,
    buffer: FrameBuffer,
}

impl MasterLink {
    pub fn master(&self) -> &ReplicaOf {
        &self.master
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// The stream plus any bytes the master sent past the last handshake reply
    pub fn into_parts(self) -> (TcpStream, FrameBuffer) {
        (self.stream, self.buffer)
    }
}

/// Drives the handshake against one master
#[derive(Debug)]
pub struct ReplicaHandshake {
    master: ReplicaOf,
    listening_port: u16,
    step_timeout: Duration,
    state: HandshakeState,
}

impl ReplicaHandshake {
    /// `listening_port` is announced to the master; a zero `step_timeout`
    /// waits forever
    pub fn new(master: ReplicaOf, listening_port: u16, step_timeout: Duration) -> Self {
        Self {
            master,
            listening_port,
            step_timeout,
            state: HandshakeState::NotStarted,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run every step, returning the open master connection
    pub fn run(&mut self) -> Result<MasterLink, HandshakeError> {
        let mut stream = self.connect()?;
        let mut buffer = FrameBuffer::new();

        tracing::debug!("Connected to master {}", self.master);

        // Step 1: PING
        self.send(&mut stream, &Command::new("PING", Vec::<String>::new()), "PING")?;
        self.state = HandshakeState::SentPing;
        let reply = self.await_reply(&mut stream, &mut buffer, "PING")?;
        expect_text(reply, "PONG", "PING")?;

        // Step 2: announce our listening port
        let port = self.listening_port.to_string();
        let announce = Command::new("REPLCONF", ["listening-port", port.as_str()]);
        self.send(&mut stream, &announce, "REPLCONF listening-port")?;
        self.state = HandshakeState::SentListeningPort;
        let reply = self.await_reply(&mut stream, &mut buffer, "REPLCONF listening-port")?;
        expect_simple(reply, "OK", "REPLCONF listening-port")?;

        // Step 3: announce capabilities
        let capa = Command::new("REPLCONF", ["capa", "psync2"]);
        self.send(&mut stream, &capa, "REPLCONF capa")?;
        self.state = HandshakeState::SentCapabilities;
        let reply = self.await_reply(&mut stream, &mut buffer, "REPLCONF capa")?;
        expect_simple(reply, "OK", "REPLCONF capa")?;

        self.state = HandshakeState::AwaitingFullResync;
        tracing::info!("Handshake with master {} complete", self.master);

        Ok(MasterLink {
            master: self.master.clone(),
            stream,
            buffer,
        })
    }

    fn timeout(&self) -> Option<Duration> {
        (!self.step_timeout.is_zero()).then_some(self.step_timeout)
    }

    fn connect(&self) -> Result<TcpStream, HandshakeError> {
        let addr = self.master.addr();
        let candidates = addr
            .to_socket_addrs()
            .map_err(|source| HandshakeError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut last_error = None;
        for candidate in candidates {
            let attempt = match self.timeout() {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(self.timeout())?;
                    stream.set_write_timeout(self.timeout())?;
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(source) => Err(HandshakeError::Connect { addr, source }),
            None => Err(HandshakeError::Resolve(addr)),
        }
    }

    fn send(
        &self,
        stream: &mut TcpStream,
        command: &Command,
        step: &'static str,
    ) -> Result<(), HandshakeError> {
        tracing::trace!("Sending {} to master {}", step, self.master);
        stream
            .write_all(&command.encode())
            .and_then(|_| stream.flush())
            .map_err(|e| io_failure(e, step))
    }

    fn await_reply(
        &self,
        stream: &mut TcpStream,
        buffer: &mut FrameBuffer,
        step: &'static str,
    ) -> Result<ProtocolValue, HandshakeError> {
        loop {
            if let Some(frame) = buffer.next_frame()? {
                tracing::trace!("Master replied to {}: {}", step, frame);
                return Ok(frame);
            }

            match buffer.read_from(stream) {
                Ok(0) => return Err(HandshakeError::Closed { step }),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(io_failure(e, step)),
            }
        }
    }
}

/// Accept a simple or bulk string equal to `expected`, ignoring case
fn expect_text(
    reply: ProtocolValue,
    expected: &str,
    step: &'static str,
) -> Result<(), HandshakeError> {
    if let ProtocolValue::Error(message) = reply {
        return Err(HandshakeError::Rejected { step, message });
    }

    if reply
        .as_text()
        .is_some_and(|text| text.eq_ignore_ascii_case(expected))
    {
        return Ok(());
    }

    Err(HandshakeError::UnexpectedReply {
        step,
        reply: reply.to_string(),
    })
}

/// Accept only a simple string equal to `expected`, ignoring case
fn expect_simple(
    reply: ProtocolValue,
    expected: &str,
    step: &'static str,
) -> Result<(), HandshakeError> {
    match reply {
        ProtocolValue::SimpleString(text) if text.eq_ignore_ascii_case(expected) => Ok(()),
        ProtocolValue::Error(message) => Err(HandshakeError::Rejected { step, message }),
        other => Err(HandshakeError::UnexpectedReply {
            step,
            reply: other.to_string(),
        }),
    }
}

fn io_failure(e: io::Error, step: &'static str) -> HandshakeError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => HandshakeError::Timeout { step },
        io::ErrorKind::UnexpectedEof => HandshakeError::Closed { step },
        _ => HandshakeError::Io(e),
    }
}
