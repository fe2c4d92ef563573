//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop
//! - One thread per connection
//! - Commands routed through the shared Dispatcher

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
