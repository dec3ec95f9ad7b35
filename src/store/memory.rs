use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::MirrorStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process store. State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all live keys and values, sorted by key.
    pub async fn snapshot(&self) -> Vec<(String, String)> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        let mut live: Vec<(String, String)> = entries
            .iter()
            .filter(|(_, e)| e.expires_at.is_none_or(|at| at > now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect();
        live.sort();
        live
    }
}

#[async_trait]
impl MirrorStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at.is_none_or(|at| at > now))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl
            .map(|ttl| chrono::Duration::from_std(ttl).map(|ttl| Utc::now() + ttl))
            .transpose()?;
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at.is_none_or(|at| at > now));
        Ok((before - entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("latest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryStore::new();
        store.put("latest", "1", None).await.unwrap();
        store.put("latest", "2", None).await.unwrap();
        assert_eq!(store.get("latest").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_expired_key_reads_absent() {
        let store = MemoryStore::new();
        store
            .put("post-1", "abc", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("post-1").await.unwrap(), None);
        assert!(store.snapshot().await.is_empty());
    }
}
