use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

/// Namespaced single-use token storage with per-entry TTL. The web layer keeps
/// short-lived one-time state (confirmation codes, cross-request nonces) here
/// instead of in an ambient global map; the store is always passed in as a
/// dependency so the backing can be swapped without touching consumers.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait StateTokenStore: Send + Sync {
    /// Insert or replace the value under (namespace, key), expiring after
    /// `ttl_seconds`.
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl_seconds: i64,
    ) -> anyhow::Result<()>;

    /// Remove and return the value. Expired entries are dropped and reported
    /// as absent; a second take of the same key always returns `None`.
    async fn take(&self, namespace: &str, key: &str) -> anyhow::Result<Option<String>>;

    /// Drop every entry past its TTL, returning how many were removed.
    async fn cleanup_expired(&self) -> anyhow::Result<usize>;
}

struct StateEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process implementation over a keyed map.
pub struct MemoryStateStore {
    entries: RwLock<HashMap<(String, String), StateEntry>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateTokenStore for MemoryStateStore {
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl_seconds: i64,
    ) -> anyhow::Result<()> {
        let entry = StateEntry {
            value,
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        };
        self.entries
            .write()
            .await
            .insert((namespace.to_string(), key.to_string()), entry);
        Ok(())
    }

    async fn take(&self, namespace: &str, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.write().await;
        match entries.remove(&(namespace.to_string(), key.to_string())) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value)),
            Some(_) => Ok(None),
            None => Ok(None),
        }
    }

    async fn cleanup_expired(&self) -> anyhow::Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Utc::now();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Purged expired state tokens");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_take_roundtrip() {
        let store = MemoryStateStore::new();
        store
            .put("confirm", "abc", "user-1".to_string(), 60)
            .await
            .unwrap();

        assert_eq!(
            store.take("confirm", "abc").await.unwrap(),
            Some("user-1".to_string())
        );
        // single use
        assert_eq!(store.take("confirm", "abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let store = MemoryStateStore::new();
        store
            .put("a", "k", "first".to_string(), 60)
            .await
            .unwrap();
        store
            .put("b", "k", "second".to_string(), 60)
            .await
            .unwrap();

        assert_eq!(store.take("a", "k").await.unwrap(), Some("first".to_string()));
        assert_eq!(store.take("b", "k").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let store = MemoryStateStore::new();
        store
            .put("confirm", "old", "x".to_string(), -1)
            .await
            .unwrap();

        assert_eq!(store.take("confirm", "old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cleanup_expired_counts() {
        let store = MemoryStateStore::new();
        store.put("n", "live", "x".to_string(), 60).await.unwrap();
        store.put("n", "dead1", "y".to_string(), -1).await.unwrap();
        store.put("n", "dead2", "z".to_string(), -5).await.unwrap();

        assert_eq!(store.cleanup_expired().await.unwrap(), 2);
        assert_eq!(store.cleanup_expired().await.unwrap(), 0);
        assert_eq!(store.take("n", "live").await.unwrap(), Some("x".to_string()));
    }
}
