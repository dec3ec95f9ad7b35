//! Persistent mirror state: the timeline cursor and source-to-destination
//! post mappings, kept in a string key/value store with per-key expiry.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Key holding the id of the newest mirrored source post.
pub const LATEST_KEY: &str = "latest";

/// Key holding the destination status id mirrored from a source post.
#[must_use]
pub fn post_key(source_post_id: &str) -> String {
    format!("post-{source_post_id}")
}

/// Key/value store shared by the sync cycles.
///
/// There are no transactional guarantees. A missing key is a normal
/// condition and reads as `None`.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Read a key. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, replacing any previous value. With a `ttl` the key
    /// expires that long after the write.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Drop expired keys, returning how many were removed. Expired keys
    /// already read as absent, so this only reclaims space.
    async fn purge_expired(&self) -> Result<u64> {
        Ok(0)
    }
}
