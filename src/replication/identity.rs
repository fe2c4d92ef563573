//! Server replication identity

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::{Config, ReplicaOf};

/// Length of a master replication id
pub const REPLICATION_ID_LEN: usize = 40;

/// Role this server plays in replication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Master,
    Replica(ReplicaOf),
}

/// Who this server is, replication-wise
///
/// Built once at startup and shared by reference with the components
/// that report or act on it.
#[derive(Debug)]
pub struct ServerIdentity {
    role: Role,

    /// Random id generated by masters; replicas have none
    replication_id: Option<String>,

    /// Never decreases
    replication_offset: AtomicU64,
}

impl ServerIdentity {
    /// A master with a fresh replication id and offset 0
    pub fn master() -> Self {
        Self {
            role: Role::Master,
            replication_id: Some(generate_replication_id()),
            replication_offset: AtomicU64::new(0),
        }
    }

    /// A replica of the given master
    pub fn replica(master: ReplicaOf) -> Self {
        Self {
            role: Role::Replica(master),
            replication_id: None,
            replication_offset: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match &config.replica_of {
            Some(master) => Self::replica(master.clone()),
            None => Self::master(),
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    pub fn replication_id(&self) -> Option<&str> {
        self.replication_id.as_deref()
    }

    pub fn replication_offset(&self) -> u64 {
        self.replication_offset.load(Ordering::Acquire)
    }

    /// Move the offset forward by `bytes`, returning the new offset
    pub fn advance_offset(&self, bytes: u64) -> u64 {
        self.replication_offset.fetch_add(bytes, Ordering::AcqRel) + bytes
    }

    /// Body of the `INFO replication` reply
    pub fn info_replication(&self) -> String {
        match &self.role {
            Role::Master => format!(
                "role:master\r\nmaster_replid:{}\r\nmaster_repl_offset:{}",
                self.replication_id.as_deref().unwrap_or_default(),
                self.replication_offset()
            ),
            Role::Replica(_) => "role:slave".to_string(),
        }
    }
}

fn generate_replication_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REPLICATION_ID_LEN)
        .map(char::from)
        .collect()
}
