//! Replication Module
//!
//! Role tracking and the replica side of the master handshake.
//!
//! ## Roles
//! - **Master**: generates a 40-character replication id at startup and
//!   reports it through `INFO replication`
//! - **Replica**: before serving clients, connects to its master and
//!   performs the handshake; on failure it keeps running standalone
//!
//! Full resynchronization (PSYNC) and write propagation are out of scope;
//! a completed handshake leaves an open [`MasterLink`] for them.

mod handshake;
mod identity;

pub use handshake::{HandshakeState, MasterLink, ReplicaHandshake};
pub use identity::{Role, ServerIdentity, REPLICATION_ID_LEN};
