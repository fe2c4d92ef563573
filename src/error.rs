//! Error types for RelayKV
//!
//! `RelayError` is the unified error for the server and connection layers.
//! The codec, dispatcher and replica handshake each have their own error
//! type because callers branch on them; all of them convert into
//! `RelayError`.

use std::io;

use thiserror::Error;

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type for RelayKV operations
#[derive(Debug, Error)]
pub enum RelayError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(#[from] DecodeError),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Replication Errors
    // -------------------------------------------------------------------------
    #[error("Replication handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure to decode a frame from buffered bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before the frame does; read more bytes and retry
    #[error("incomplete frame")]
    Incomplete,

    /// The bytes can never form a valid frame
    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Rejection of a request by the dispatcher
///
/// Every variant is reported to the client as the same generic reply;
/// the detail only reaches the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("request is not an array of bulk strings")]
    InvalidRequest,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    #[error("syntax error in '{command}': {reason}")]
    Syntax {
        command: &'static str,
        reason: String,
    },
}

/// Failure during the replica → master handshake
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("cannot connect to master {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("master address '{0}' did not resolve")]
    Resolve(String),

    #[error("I/O error talking to master: {0}")]
    Io(#[from] io::Error),

    #[error("master did not answer {step} in time")]
    Timeout { step: &'static str },

    #[error("master closed the connection during {step}")]
    Closed { step: &'static str },

    #[error("master rejected {step}: {message}")]
    Rejected {
        step: &'static str,
        message: String,
    },

    #[error("unexpected reply to {step}: {reply}")]
    UnexpectedReply { step: &'static str, reply: String },

    #[error("undecodable reply from master: {0}")]
    Decode(#[from] DecodeError),
}
