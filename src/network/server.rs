//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::Connection;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{RelayError, Result};
use crate::keyspace::{ExpirySweeper, Keyspace};
use crate::replication::{HandshakeState, MasterLink, ReplicaHandshake, Role, ServerIdentity};

/// TCP server for RelayKV
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    keyspace: Arc<Keyspace>,
    identity: Arc<ServerIdentity>,
    dispatcher: Arc<Dispatcher>,

    /// Sessions currently running
    active_connections: Arc<AtomicUsize>,

    shutdown: AtomicBool,

    /// Where the replica handshake stopped; `None` for masters
    handshake_state: Mutex<Option<HandshakeState>>,

    /// Open connection to the master after a successful handshake
    master_link: Mutex<Option<MasterLink>>,
}

impl Server {
    /// Bind the listener and build the shared state
    pub fn bind(config: Config) -> Result<Self> {
        Self::bind_with_keyspace(config, Arc::new(Keyspace::new()))
    }

    /// Bind the listener around an existing keyspace
    pub fn bind_with_keyspace(config: Config, keyspace: Arc<Keyspace>) -> Result<Self> {
        if config.max_connections == 0 {
            return Err(RelayError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            RelayError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        let identity = Arc::new(ServerIdentity::from_config(&config));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&keyspace), Arc::clone(&identity)));

        Ok(Self {
            config,
            listener,
            local_addr,
            keyspace,
            identity,
            dispatcher,
            active_connections: Arc::new(AtomicUsize::new(0)),
            shutdown: AtomicBool::new(false),
            handshake_state: Mutex::new(None),
            master_link: Mutex::new(None),
        })
    }

    /// Serve clients until [`Server::shutdown`] is called (blocking)
    ///
    /// A replica first performs the master handshake. A failed handshake
    /// is logged and the server keeps running standalone.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        let _sweeper = match self.config.sweep_interval_ms {
            Some(ms) if ms > 0 => Some(ExpirySweeper::spawn(
                Arc::clone(&self.keyspace),
                Duration::from_millis(ms),
            )?),
            _ => None,
        };

        self.connect_to_master();

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            match stream {
                Ok(stream) => self.spawn_connection(stream),
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            }
        }

        tracing::info!("Server on {} stopped accepting connections", self.local_addr);
        Ok(())
    }

    /// Signal the accept loop to stop
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        // Wake the blocking accept so the loop sees the flag.
        let _ = TcpStream::connect(self.local_addr);
    }

    fn connect_to_master(&self) {
        let Role::Replica(master) = self.identity.role() else {
            return;
        };

        tracing::info!("Starting handshake with master {}", master);

        let mut handshake = ReplicaHandshake::new(
            master.clone(),
            self.local_addr.port(),
            Duration::from_millis(self.config.handshake_timeout_ms),
        );
        let outcome = handshake.run();
        *self.handshake_state.lock() = Some(handshake.state());

        match outcome {
            Ok(link) => *self.master_link.lock() = Some(link),
            Err(e) => tracing::warn!(
                "Handshake with master {} failed at {:?}: {}; serving standalone",
                master,
                handshake.state(),
                e
            ),
        }
    }

    fn spawn_connection(&self, stream: TcpStream) {
        let active = self.active_connections.fetch_add(1, Ordering::AcqRel);
        if active >= self.config.max_connections {
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(
                "Refusing connection from {:?}: {} connections already open",
                stream.peer_addr().ok(),
                active
            );
            return;
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let active_connections = Arc::clone(&self.active_connections);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name("relaykv-conn".to_string())
            .spawn(move || {
                let result = Connection::new(stream, dispatcher).and_then(|mut connection| {
                    connection.set_timeouts(read_ms, write_ms)?;
                    connection.handle()
                });
                if let Err(e) = result {
                    tracing::warn!("Connection ended with error: {}", e);
                }
                active_connections.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!("Failed to spawn connection thread: {}", e);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The bound address (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn keyspace(&self) -> &Arc<Keyspace> {
        &self.keyspace
    }

    pub fn identity(&self) -> &Arc<ServerIdentity> {
        &self.identity
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where the replica handshake ended, once it has run
    pub fn handshake_state(&self) -> Option<HandshakeState> {
        *self.handshake_state.lock()
    }

    pub fn has_master_link(&self) -> bool {
        self.master_link.lock().is_some()
    }

    /// Take the master connection for the resynchronization phase
    pub fn take_master_link(&self) -> Option<MasterLink> {
        self.master_link.lock().take()
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }
}
