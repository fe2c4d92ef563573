//! Keyspace Module
//!
//! The shared in-memory key → value map.
//!
//! ## Responsibilities
//! - One map shared by every connection on the server
//! - Optional absolute expiry per entry
//! - Lazy eviction: an expired entry is removed by the first accessor
//!   that observes it
//!
//! ## Data Structure Choice
//! `HashMap` wrapped in a `parking_lot::RwLock`:
//! - Reads proceed concurrently under the read lock
//! - Writes and evictions take the write lock
//! - No operation holds the lock across I/O

mod clock;
mod store;
mod sweeper;

use std::time::Instant;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::Keyspace;
pub use sweeper::ExpirySweeper;

/// A stored value and its optional deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: String,

    /// `None` never expires
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// An entry is dead once `now` reaches its deadline
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}
