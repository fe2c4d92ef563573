//! Command table
//!
//! Maps an upper-case command name to its arity and handler. Adding a
//! command means writing a handler and registering it here.

use std::collections::HashMap;

use super::handlers::{handle_echo, handle_get, handle_info, handle_ping, handle_replconf, handle_set};
use super::Dispatcher;
use crate::error::CommandError;
use crate::protocol::ProtocolValue;

/// Signature shared by every command handler
pub type CommandHandler = fn(&Dispatcher, &[String]) -> Result<ProtocolValue, CommandError>;

/// Argument-count constraint, checked before the handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

/// One command table entry
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Canonical upper-case name
    pub name: &'static str,
    pub arity: Arity,
    pub handler: CommandHandler,
}

/// Name → command lookup table
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    entries: HashMap<&'static str, CommandSpec>,
}

impl CommandRegistry {
    /// An empty table
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The table of every command this server understands
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();

        // Connection
        registry.register(CommandSpec {
            name: "PING",
            arity: Arity::AtLeast(0),
            handler: handle_ping,
        });
        registry.register(CommandSpec {
            name: "ECHO",
            arity: Arity::Exact(1),
            handler: handle_echo,
        });

        // Strings
        registry.register(CommandSpec {
            name: "SET",
            arity: Arity::AtLeast(2),
            handler: handle_set,
        });
        registry.register(CommandSpec {
            name: "GET",
            arity: Arity::Exact(1),
            handler: handle_get,
        });

        // Replication
        registry.register(CommandSpec {
            name: "INFO",
            arity: Arity::AtLeast(0),
            handler: handle_info,
        });
        registry.register(CommandSpec {
            name: "REPLCONF",
            arity: Arity::AtLeast(2),
            handler: handle_replconf,
        });

        registry
    }

    /// Add or replace a command
    pub fn register(&mut self, spec: CommandSpec) {
        self.entries.insert(spec.name, spec);
    }

    /// Find a command by its upper-case name
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
