//! Tiered store: volatile, small-value and large-value backends behind one
//! get/put contract.
//!
//! Reads probe the tiers in fixed order (volatile, small, large) and return
//! `None` when nothing is found. Writes pick exactly one tier:
//!
//! - no persistent backend: volatile;
//! - text or a JSON object under [`MAX_INLINE_CHARS`]: small-value, after which
//!   any volatile copy is dropped;
//! - anything else: large-value, after dropping the small-value and volatile
//!   copies.
//!
//! Persistent backend failures are logged and the write falls back to the
//! volatile tier, which then shadows the persistent copy until the next
//! successful persistent write.
//!
//! There is no per-key coordination. Two concurrent writers for the same
//! fingerprint race and the last write wins.
//!
//! [`MAX_INLINE_CHARS`]: super::entry::MAX_INLINE_CHARS

use std::path::Path;

use tracing::{debug, warn};

use super::connection::DurableTier;
use super::entry::{CacheEntry, Fingerprint, InlineRecord};
use super::kv::KvTier;
use super::memory::MemoryTier;
use crate::Error;
use crate::config::CacheConfig;

/// Physical home of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Volatile,
    Small,
    Large,
}

#[derive(Debug)]
struct Persistent {
    small: KvTier,
    large: DurableTier,
}

/// Storage shared by every cached request.
#[derive(Debug)]
pub struct TieredStore {
    memory: MemoryTier,
    persistent: Option<Persistent>,
}

impl TieredStore {
    /// A store with no persistent backends; every write stays in memory.
    pub fn volatile() -> Self {
        Self { memory: MemoryTier::new(), persistent: None }
    }

    /// Open the store described by `config`.
    ///
    /// Falls back to [`TieredStore::volatile`] when persistence is disabled or
    /// either persistent backend fails to open.
    pub async fn open(config: &CacheConfig) -> Self {
        if !config.persistent {
            debug!("persistent cache disabled, using volatile tier only");
            return Self::volatile();
        }

        match Self::open_persistent(&config.kv_path, &config.db_path).await {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "failed to open persistent cache, using volatile tier only");
                Self::volatile()
            }
        }
    }

    /// Open both persistent backends at the given paths.
    pub async fn open_persistent(kv_path: impl AsRef<Path>, db_path: impl AsRef<Path>) -> Result<Self, Error> {
        let small = KvTier::open(kv_path)?;
        let large = DurableTier::open(db_path).await?;
        Ok(Self { memory: MemoryTier::new(), persistent: Some(Persistent { small, large }) })
    }

    /// Persistent backends that never touch the filesystem, for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let large = DurableTier::open_in_memory().await?;
        Ok(Self { memory: MemoryTier::new(), persistent: Some(Persistent { small: KvTier::open_in_memory(), large }) })
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent.is_some()
    }

    /// Look up the entry for `key`.
    pub async fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        self.find(key).await.map(|(entry, _)| entry)
    }

    /// Which tier currently serves reads for `key`.
    pub async fn locate(&self, key: &Fingerprint) -> Option<Tier> {
        self.find(key).await.map(|(_, tier)| tier)
    }

    async fn find(&self, key: &Fingerprint) -> Option<(CacheEntry, Tier)> {
        if let Some(entry) = self.memory.get(key).await {
            return Some((entry, Tier::Volatile));
        }

        let persistent = self.persistent.as_ref()?;

        match persistent.small.get(key) {
            Ok(Some(entry)) => return Some((entry, Tier::Small)),
            Ok(None) => {}
            Err(e) => warn!(%key, error = %e, "small-value tier read failed"),
        }

        match persistent.large.get_entry(key).await {
            Ok(Some(entry)) => Some((entry, Tier::Large)),
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "large-value tier read failed");
                None
            }
        }
    }

    /// Store `entry`, replacing whatever was cached under its key.
    ///
    /// Returns the tier the entry landed in.
    pub async fn put(&self, entry: &CacheEntry) -> Tier {
        let Some(persistent) = &self.persistent else {
            self.memory.put(entry.clone()).await;
            return Tier::Volatile;
        };

        let written = match InlineRecord::for_entry(entry) {
            Some(record) => persistent.small.put(&entry.key, &record).map(|()| Tier::Small),
            None => match persistent.small.remove(&entry.key) {
                Ok(()) => persistent.large.upsert_entry(entry).await.map(|()| Tier::Large),
                Err(e) => Err(e),
            },
        };

        match written {
            Ok(tier) => {
                self.memory.remove(&entry.key).await;
                debug!(key = %entry.key, ?tier, "stored cache entry");
                tier
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "persistent cache write failed, keeping entry in memory");
                self.memory.put(entry.clone()).await;
                Tier::Volatile
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::{MAX_INLINE_CHARS, Payload};
    use crate::cache::hash::{content_hash, fingerprint};
    use bytes::Bytes;
    use serde_json::json;

    fn entry(url: &str, data: Payload) -> CacheEntry {
        CacheEntry { key: fingerprint(&url.into()), hash: content_hash("json", url), data }
    }

    fn large_object() -> Payload {
        Payload::Json(json!({ "blob": "x".repeat(MAX_INLINE_CHARS) }))
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = TieredStore::open_in_memory().await.unwrap();
        assert!(store.get(&fingerprint(&"https://example.com".into())).await.is_none());
    }

    #[tokio::test]
    async fn test_volatile_store_keeps_everything_in_memory() {
        let store = TieredStore::volatile();
        let small = entry("https://example.com/a", Payload::Text("abc".into()));
        let large = entry("https://example.com/b", large_object());

        assert_eq!(store.put(&small).await, Tier::Volatile);
        assert_eq!(store.put(&large).await, Tier::Volatile);
        assert_eq!(store.get(&large.key).await, Some(large));
        assert!(!store.is_persistent());
    }

    #[tokio::test]
    async fn test_small_structured_payload_goes_to_small_tier() {
        let store = TieredStore::open_in_memory().await.unwrap();
        let e = entry("https://example.com/api", Payload::Json(json!({"name": "widget"})));

        assert_eq!(store.put(&e).await, Tier::Small);
        assert_eq!(store.locate(&e.key).await, Some(Tier::Small));
        assert_eq!(store.get(&e.key).await, Some(e));
    }

    #[tokio::test]
    async fn test_large_payload_displaces_small_copy() {
        let store = TieredStore::open_in_memory().await.unwrap();
        let small = entry("https://example.com/api", Payload::Json(json!({"name": "widget"})));
        assert_eq!(store.put(&small).await, Tier::Small);

        let large = CacheEntry { data: large_object(), ..small.clone() };
        assert_eq!(store.put(&large).await, Tier::Large);

        let persistent = store.persistent.as_ref().unwrap();
        assert!(!persistent.small.contains(&small.key));
        assert_eq!(store.locate(&small.key).await, Some(Tier::Large));
        assert_eq!(store.get(&small.key).await, Some(large));
    }

    #[tokio::test]
    async fn test_non_inline_types_go_to_large_tier() {
        let store = TieredStore::open_in_memory().await.unwrap();
        let binary = entry("https://example.com/img", Payload::Binary(Bytes::from_static(b"\x89PNG")));
        let array = entry("https://example.com/list", Payload::Json(json!([1, 2, 3])));
        let scalar = entry("https://example.com/count", Payload::Opaque("42".into()));

        for e in [&binary, &array, &scalar] {
            assert_eq!(store.put(e).await, Tier::Large);
            assert_eq!(store.get(&e.key).await.as_ref(), Some(e));
        }
    }

    #[tokio::test]
    async fn test_small_tier_shadows_older_large_copy() {
        let store = TieredStore::open_in_memory().await.unwrap();
        let large = entry("https://example.com/api", large_object());
        store.put(&large).await;

        let small = CacheEntry { data: Payload::Text("short".into()), ..large.clone() };
        assert_eq!(store.put(&small).await, Tier::Small);
        assert_eq!(store.get(&large.key).await, Some(small));
    }

    #[tokio::test]
    async fn test_open_falls_back_to_volatile() {
        let dir = tempfile::tempdir().unwrap();
        // The small-value path is a directory, so opening it fails.
        let config = CacheConfig {
            kv_path: dir.path().to_path_buf(),
            db_path: dir.path().join("cache.sqlite"),
            ..Default::default()
        };

        let store = TieredStore::open(&config).await;
        assert!(!store.is_persistent());
    }

    #[tokio::test]
    async fn test_open_disabled_persistence() {
        let config = CacheConfig { persistent: false, ..Default::default() };
        let store = TieredStore::open(&config).await;
        assert!(!store.is_persistent());
    }

    #[tokio::test]
    async fn test_open_persistent_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            kv_path: dir.path().join("kv.json"),
            db_path: dir.path().join("cache.sqlite"),
            ..Default::default()
        };
        let e = entry("https://example.com/api", Payload::Text("abc".into()));

        {
            let store = TieredStore::open(&config).await;
            assert!(store.is_persistent());
            store.put(&e).await;
        }

        let reopened = TieredStore::open(&config).await;
        assert_eq!(reopened.get(&e.key).await, Some(e));
    }

    #[tokio::test]
    async fn test_failed_write_downgrades_to_volatile() {
        let dir = tempfile::tempdir().unwrap();
        let kv_path = dir.path().join("kv.json");
        let store = TieredStore::open_persistent(&kv_path, dir.path().join("cache.sqlite")).await.unwrap();

        // Occupy the temp-file slot with a directory so the flush fails.
        std::fs::create_dir(kv_path.with_extension("json.tmp")).unwrap();

        let e = entry("https://example.com/api", Payload::Text("abc".into()));
        assert_eq!(store.put(&e).await, Tier::Volatile);
        assert_eq!(store.locate(&e.key).await, Some(Tier::Volatile));
        assert_eq!(store.get(&e.key).await, Some(e));
    }
}
