//! Protocol values
//!
//! Typed representation of a decoded RESP frame.

use std::fmt;

use bytes::Bytes;

/// One decoded protocol value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolValue {
    /// `*<count>\r\n` followed by `count` nested values
    Array(Vec<ProtocolValue>),

    /// `$<len>\r\n<bytes>\r\n`; `None` is the null bulk string `$-1\r\n`
    BulkString(Option<Bytes>),

    /// `+<text>\r\n`
    SimpleString(String),

    /// `-<text>\r\n`
    Error(String),

    /// `:<n>\r\n`
    Integer(i64),
}

impl ProtocolValue {
    /// Create a bulk string value
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        ProtocolValue::BulkString(Some(data.into()))
    }

    /// The null bulk string
    pub fn null_bulk() -> Self {
        ProtocolValue::BulkString(None)
    }

    /// Create a simple string value
    pub fn simple(text: impl Into<String>) -> Self {
        ProtocolValue::SimpleString(text.into())
    }

    /// Create an error value
    pub fn error(text: impl Into<String>) -> Self {
        ProtocolValue::Error(text.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ProtocolValue::BulkString(None))
    }

    /// Text of a simple or non-null bulk string, if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProtocolValue::SimpleString(text) => Some(text),
            ProtocolValue::BulkString(Some(data)) => std::str::from_utf8(data).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ProtocolValue::BulkString(Some(data)) => {
                write!(f, "\"{}\"", String::from_utf8_lossy(data))
            }
            ProtocolValue::BulkString(None) => write!(f, "(nil)"),
            ProtocolValue::SimpleString(text) => write!(f, "{}", text),
            ProtocolValue::Error(text) => write!(f, "(error) {}", text),
            ProtocolValue::Integer(n) => write!(f, "(integer) {}", n),
        }
    }
}
