//! Protocol Module
//!
//! RESP-style wire protocol shared by clients, the server and the replica
//! handshake.
//!
//! ## Request Format
//! ```text
//! *2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n
//! ```
//! Every request is an array of bulk strings: command name first, then
//! its arguments.
//!
//! ## Reply Formats
//! - Bulk:   `$<len>\r\n<bytes>\r\n`
//! - Null:   `$-1\r\n`
//! - Status: `+<text>\r\n`

mod buffer;
mod codec;
mod command;
mod value;

pub use buffer::{FrameBuffer, MAX_PENDING, READ_CHUNK_SIZE};
pub use codec::{
    decode_next, encode_array, encode_bulk, encode_error, encode_integer, encode_null_bulk,
    encode_simple, encode_value, MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_DEPTH, MAX_LINE_LEN, NULL_BULK,
};
pub use command::Command;
pub use value::ProtocolValue;
