//! Command definitions
//!
//! A request frame reduced to a command name and its arguments.

use super::codec::encode_array;
use super::ProtocolValue;

/// A parsed client request
///
/// Built once per request frame. Frames that are not a non-empty array
/// of UTF-8 bulk strings become [`Command::invalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Upper-cased command token; empty for the invalid sentinel
    name: String,

    /// Positional arguments in request order
    args: Vec<String>,
}

impl Command {
    /// Create a command, upper-casing its name
    pub fn new<I, S>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_ascii_uppercase(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The sentinel for requests that could not be parsed
    pub fn invalid() -> Self {
        Self {
            name: String::new(),
            args: Vec::new(),
        }
    }

    /// Reduce a decoded request frame to a command
    pub fn from_frame(frame: ProtocolValue) -> Self {
        let ProtocolValue::Array(items) = frame else {
            return Self::invalid();
        };

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let ProtocolValue::BulkString(Some(data)) = item else {
                return Self::invalid();
            };
            match String::from_utf8(data.to_vec()) {
                Ok(part) => parts.push(part),
                Err(_) => return Self::invalid(),
            }
        }

        let mut parts = parts.into_iter();
        match parts.next() {
            Some(name) if !name.is_empty() => Self::new(&name, parts),
            _ => Self::invalid(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_invalid(&self) -> bool {
        self.name.is_empty()
    }

    /// Wire form: an array of bulk strings, name first
    pub fn encode(&self) -> Vec<u8> {
        encode_array(std::iter::once(&self.name).chain(self.args.iter()).collect::<Vec<_>>())
    }
}
