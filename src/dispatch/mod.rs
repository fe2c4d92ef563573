//! Dispatch Module
//!
//! Routes parsed commands to their handlers.
//!
//! ## Responsibilities
//! - Look the command name up in the command table
//! - Reject wrong arity before any handler runs
//! - Collapse every rejection into the single generic reply
//!
//! The dispatcher holds no connection state: one instance is shared by
//! every session on the server.

mod handlers;
mod registry;

use std::sync::Arc;

pub use registry::{Arity, CommandHandler, CommandRegistry, CommandSpec};

use crate::error::CommandError;
use crate::keyspace::Keyspace;
use crate::protocol::{Command, ProtocolValue};
use crate::replication::ServerIdentity;

/// Body of the reply to any rejected request
pub const INVALID_INPUT: &str = "Invalid input";

/// Executes commands against the shared keyspace and server identity
#[derive(Debug)]
pub struct Dispatcher {
    keyspace: Arc<Keyspace>,
    identity: Arc<ServerIdentity>,
    registry: CommandRegistry,
}

impl Dispatcher {
    /// Create a dispatcher with the built-in command table
    pub fn new(keyspace: Arc<Keyspace>, identity: Arc<ServerIdentity>) -> Self {
        Self::with_registry(keyspace, identity, CommandRegistry::with_builtin_commands())
    }

    pub fn with_registry(
        keyspace: Arc<Keyspace>,
        identity: Arc<ServerIdentity>,
        registry: CommandRegistry,
    ) -> Self {
        Self {
            keyspace,
            identity,
            registry,
        }
    }

    /// Execute a command and return the reply to send
    ///
    /// Never fails: rejected requests get the generic `Invalid input`
    /// bulk reply and the reason is logged.
    pub fn dispatch(&self, command: &Command) -> ProtocolValue {
        match self.execute(command) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!("Rejected request: {}", e);
                ProtocolValue::bulk(INVALID_INPUT)
            }
        }
    }

    /// Execute a command, surfacing the rejection reason
    pub fn execute(&self, command: &Command) -> Result<ProtocolValue, CommandError> {
        if command.is_invalid() {
            return Err(CommandError::InvalidRequest);
        }

        let spec = self
            .registry
            .lookup(command.name())
            .ok_or_else(|| CommandError::UnknownCommand(command.name().to_string()))?;

        if !spec.arity.accepts(command.args().len()) {
            return Err(CommandError::WrongArity(spec.name));
        }

        (spec.handler)(self, command.args())
    }

    pub fn keyspace(&self) -> &Arc<Keyspace> {
        &self.keyspace
    }

    pub fn identity(&self) -> &Arc<ServerIdentity> {
        &self.identity
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}
