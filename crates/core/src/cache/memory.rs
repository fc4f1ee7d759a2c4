//! Volatile in-process tier.
//!
//! Lives only as long as the process. Always probed first on reads.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::entry::{CacheEntry, Fingerprint};

#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<Fingerprint, CacheEntry>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn put(&self, entry: CacheEntry) {
        self.entries.write().await.insert(entry.key.clone(), entry);
    }

    /// Drop the entry for `key`, returning whether one existed.
    pub async fn remove(&self, key: &Fingerprint) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::Payload;
    use crate::cache::hash::{content_hash, fingerprint};

    #[tokio::test]
    async fn test_put_get_remove() {
        let tier = MemoryTier::new();
        let key = fingerprint(&"https://example.com".into());
        let entry = CacheEntry { key: key.clone(), hash: content_hash("text", "abc"), data: Payload::Text("abc".into()) };

        assert!(tier.get(&key).await.is_none());
        tier.put(entry.clone()).await;
        assert_eq!(tier.get(&key).await, Some(entry));
        assert_eq!(tier.len().await, 1);

        assert!(tier.remove(&key).await);
        assert!(!tier.remove(&key).await);
        assert!(tier.get(&key).await.is_none());
    }
}
