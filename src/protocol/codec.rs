//! Protocol codec
//!
//! Encoding and decoding functions for the RESP wire format.
//!
//! ## Wire Format
//!
//! ```text
//! *<count>\r\n<value>...      array
//! $<len>\r\n<bytes>\r\n       bulk string ($-1\r\n is null)
//! +<text>\r\n                 simple string
//! -<text>\r\n                 error
//! :<n>\r\n                    integer
//! ```
//!
//! Decoding never blocks and never consumes input on failure. A frame
//! cut short by the transport is reported as [`DecodeError::Incomplete`]
//! so the caller can wait for more bytes.

use std::io::Cursor;

use bytes::{Buf, Bytes};

use super::ProtocolValue;
use crate::error::DecodeError;

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Largest accepted bulk string (512 MB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest accepted array element count
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Deepest accepted array nesting
pub const MAX_DEPTH: usize = 32;

/// Longest accepted header or simple line, terminator excluded
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Encoded null bulk string
pub const NULL_BULK: &[u8] = b"$-1\r\n";

// =============================================================================
// Decoding
// =============================================================================

/// Decode one value from the front of `bytes`
///
/// Returns the value and the number of bytes it occupied.
pub fn decode_next(bytes: &[u8]) -> Result<(ProtocolValue, usize), DecodeError> {
    let mut src = Cursor::new(bytes);
    let value = parse_value(&mut src, 0)?;
    Ok((value, src.position() as usize))
}

fn parse_value(src: &mut Cursor<&[u8]>, depth: usize) -> Result<ProtocolValue, DecodeError> {
    if !src.has_remaining() {
        return Err(DecodeError::Incomplete);
    }

    match src.get_u8() {
        b'*' => {
            if depth >= MAX_DEPTH {
                return Err(malformed(format!(
                    "arrays nested deeper than {} levels",
                    MAX_DEPTH
                )));
            }

            let count = get_decimal(src)?;
            if count < 0 {
                return Err(malformed(format!("invalid array length {}", count)));
            }
            if count > MAX_ARRAY_LEN {
                return Err(malformed(format!(
                    "array of {} elements exceeds limit of {}",
                    count, MAX_ARRAY_LEN
                )));
            }

            let mut items = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                items.push(parse_value(src, depth + 1)?);
            }
            Ok(ProtocolValue::Array(items))
        }
        b'$' => {
            let len = get_decimal(src)?;
            if len == -1 {
                return Ok(ProtocolValue::BulkString(None));
            }
            if len < 0 {
                return Err(malformed(format!("invalid bulk length {}", len)));
            }
            if len > MAX_BULK_LEN {
                return Err(malformed(format!(
                    "bulk length {} exceeds limit of {}",
                    len, MAX_BULK_LEN
                )));
            }

            let len = len as usize;
            if src.remaining() < len + CRLF.len() {
                return Err(DecodeError::Incomplete);
            }

            let chunk = src.chunk();
            if &chunk[len..len + CRLF.len()] != CRLF {
                return Err(malformed(format!(
                    "bulk string does not end after its declared {} bytes",
                    len
                )));
            }

            let data = Bytes::copy_from_slice(&chunk[..len]);
            src.advance(len + CRLF.len());
            Ok(ProtocolValue::BulkString(Some(data)))
        }
        b'+' => Ok(ProtocolValue::SimpleString(get_text(src)?)),
        b'-' => Ok(ProtocolValue::Error(get_text(src)?)),
        b':' => Ok(ProtocolValue::Integer(get_decimal(src)?)),
        other => Err(malformed(format!("unknown type tag 0x{:02x}", other))),
    }
}

/// Read up to the next CRLF, leaving the cursor just past it
///
/// Only the first `MAX_LINE_LEN` bytes plus the terminator are searched.
fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], DecodeError> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();
    let window = &buf[start..buf.len().min(start + MAX_LINE_LEN + CRLF.len())];

    let Some(offset) = window.windows(CRLF.len()).position(|w| w == CRLF) else {
        if window.len() == MAX_LINE_LEN + CRLF.len() {
            return Err(malformed(format!(
                "line exceeds {} bytes without a terminator",
                MAX_LINE_LEN
            )));
        }
        return Err(DecodeError::Incomplete);
    };

    let end = start + offset;
    src.set_position((end + CRLF.len()) as u64);
    Ok(&buf[start..end])
}

fn get_text(src: &mut Cursor<&[u8]>) -> Result<String, DecodeError> {
    let line = get_line(src)?;
    String::from_utf8(line.to_vec()).map_err(|_| malformed("line is not valid UTF-8"))
}

/// Parse an optionally negative decimal line. Only ASCII digits are accepted.
fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, DecodeError> {
    let line = get_line(src)?;

    let (negative, digits) = match line.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, line),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(malformed(format!(
            "invalid decimal '{}'",
            String::from_utf8_lossy(line)
        )));
    }

    let mut value: i64 = 0;
    for digit in digits {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(digit - b'0')))
            .ok_or_else(|| malformed("decimal overflows 64 bits"))?;
    }

    Ok(if negative { -value } else { value })
}

fn malformed(reason: impl Into<String>) -> DecodeError {
    DecodeError::Malformed(reason.into())
}

// =============================================================================
// Encoding
// =============================================================================

/// `$<len>\r\n<data>\r\n`
pub fn encode_bulk(data: impl AsRef<[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    write_bulk(&mut out, data.as_ref());
    out
}

/// `$-1\r\n`
pub fn encode_null_bulk() -> Vec<u8> {
    NULL_BULK.to_vec()
}

/// `+<text>\r\n`
pub fn encode_simple(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 3);
    write_line(&mut out, b'+', text.as_bytes());
    out
}

/// `-<text>\r\n`
pub fn encode_error(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 3);
    write_line(&mut out, b'-', text.as_bytes());
    out
}

/// `:<n>\r\n`
pub fn encode_integer(n: i64) -> Vec<u8> {
    let mut out = Vec::new();
    write_line(&mut out, b':', n.to_string().as_bytes());
    out
}

/// `*<n>\r\n` followed by every item as a bulk string
pub fn encode_array<I, T>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
    T: AsRef<[u8]>,
{
    let items = items.into_iter();
    let mut out = Vec::new();
    write_line(&mut out, b'*', items.len().to_string().as_bytes());
    for item in items {
        write_bulk(&mut out, item.as_ref());
    }
    out
}

/// Encode any protocol value
pub fn encode_value(value: &ProtocolValue) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &ProtocolValue) {
    match value {
        ProtocolValue::Array(items) => {
            write_line(out, b'*', items.len().to_string().as_bytes());
            for item in items {
                write_value(out, item);
            }
        }
        ProtocolValue::BulkString(Some(data)) => write_bulk(out, data),
        ProtocolValue::BulkString(None) => out.extend_from_slice(NULL_BULK),
        ProtocolValue::SimpleString(text) => write_line(out, b'+', text.as_bytes()),
        ProtocolValue::Error(text) => write_line(out, b'-', text.as_bytes()),
        ProtocolValue::Integer(n) => write_line(out, b':', n.to_string().as_bytes()),
    }
}

fn write_bulk(out: &mut Vec<u8>, data: &[u8]) {
    write_line(out, b'$', data.len().to_string().as_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(CRLF);
}

fn write_line(out: &mut Vec<u8>, tag: u8, body: &[u8]) {
    out.push(tag);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}
