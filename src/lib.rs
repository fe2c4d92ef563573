//! # RelayKV
//!
//! An in-memory key-value server with:
//! - A RESP-style wire protocol with pipelining and split-frame handling
//! - Per-key TTLs with lazy expiry
//! - One keyspace shared by every client connection
//! - Master/replica roles and the replica-side handshake
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │             (one thread per connection)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bytes ⇄ ProtocolValue (codec)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Dispatcher                                 │
//! │              (command table lookup)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │  Keyspace   │          │  ServerIdentity   │
//!   │  (RwLock)   │          │  (role, replid)   │
//!   └─────────────┘          └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod dispatch;
pub mod keyspace;
pub mod network;
pub mod protocol;
pub mod replication;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, ReplicaOf};
pub use dispatch::Dispatcher;
pub use error::{RelayError, Result};
pub use keyspace::Keyspace;
pub use network::Server;
pub use replication::ServerIdentity;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RelayKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
