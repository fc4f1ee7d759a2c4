//! Small-value tier: a flat `key -> serialized record` namespace.
//!
//! The whole namespace is held in memory for synchronous reads and flushed to
//! a single JSON file on every mutation. Records are stored as JSON text of
//! shape `{"hash": ..., "data": ...}`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use super::entry::{CacheEntry, Fingerprint, InlineRecord};
use crate::Error;

#[derive(Debug)]
pub struct KvTier {
    path: Option<PathBuf>,
    records: Mutex<HashMap<String, String>>,
}

impl KvTier {
    /// Open the namespace stored at `path`.
    ///
    /// A missing file starts an empty namespace. A file that exists but does
    /// not parse is discarded with a warning; one that cannot be read at all
    /// is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let records = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!(path = %path.display(), "small-value store is corrupt, starting empty: {}", e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path: Some(path), records: Mutex::new(records) })
    }

    /// Open a namespace that is never written to disk, for testing.
    pub fn open_in_memory() -> Self {
        Self { path: None, records: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, Error> {
        let raw = self.lock().get(key.as_str()).cloned();
        match raw {
            Some(raw) => {
                let record: InlineRecord = serde_json::from_str(&raw)?;
                record.into_entry(key.clone()).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, key: &Fingerprint, record: &InlineRecord) -> Result<(), Error> {
        let raw = serde_json::to_string(record)?;
        let mut records = self.lock();
        let mut next = records.clone();
        next.insert(key.as_str().to_string(), raw);
        self.flush(&next)?;
        *records = next;
        Ok(())
    }

    /// Remove the record for `key`. Only touches the disk when something was
    /// actually removed.
    pub fn remove(&self, key: &Fingerprint) -> Result<(), Error> {
        let mut records = self.lock();
        if !records.contains_key(key.as_str()) {
            return Ok(());
        }
        let mut next = records.clone();
        next.remove(key.as_str());
        self.flush(&next)?;
        *records = next;
        Ok(())
    }

    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.lock().contains_key(key.as_str())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the namespace atomically via a sibling temp file. Callers only
    /// publish a mutation to the in-memory map once this succeeds.
    fn flush(&self, records: &HashMap<String, String>) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(records)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
