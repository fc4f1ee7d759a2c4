//! Large-value tier backend.
//!
//! Holds every entry that does not fit the small-value tier (binary bodies,
//! arrays, scalars and oversized text or objects) in one SQLite table. Access
//! is asynchronous: queries run on the tokio-rusqlite worker thread.

use std::path::Path;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::Error;

/// WAL with relaxed syncing: a power loss may drop the most recent writes.
const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
                       PRAGMA synchronous=NORMAL;
                       PRAGMA temp_store=MEMORY;";

/// Durable store for large payloads, keyed by request fingerprint.
///
/// Cloning is cheap; clones share the same worker thread.
#[derive(Clone, Debug)]
pub struct DurableTier {
    pub(crate) conn: Connection,
}

impl DurableTier {
    /// Open (or create) the tier's database file with the `cache_entries`
    /// schema in place.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// A tier that vanishes with the process.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS)).await.map_err(Error::Database)?;
        migrations::run(&conn).await?;
        tracing::debug!("large-value tier ready");
        Ok(Self { conn })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_has_schema() {
        let tier = DurableTier::open_in_memory().await.unwrap();
        assert_eq!(tier.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_file_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let tier = DurableTier::open(&path).await.unwrap();
        assert!(path.exists());

        let mode = tier
            .conn
            .call(|conn| conn.query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
