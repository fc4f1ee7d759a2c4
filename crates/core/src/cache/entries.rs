//! Entry operations on the large-value tier.

use super::connection::DurableTier;
use super::entry::{CacheEntry, ContentHash, Fingerprint, Payload, PayloadKind};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

impl DurableTier {
    /// Insert or replace the entry stored under `entry.key`.
    pub async fn upsert_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let key = entry.key.as_str().to_string();
        let hash = entry.hash.as_str().to_string();
        let kind = entry.data.kind().as_str();
        let data = entry.data.encode();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, hash, kind, data, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(key) DO UPDATE SET
                        hash = excluded.hash,
                        kind = excluded.kind,
                        data = excluded.data,
                        stored_at = excluded.stored_at",
                    params![key, hash, kind, data, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the entry stored under `key`, or `None` if there is none.
    pub async fn get_entry(&self, key: &Fingerprint) -> Result<Option<CacheEntry>, Error> {
        let lookup = key.as_str().to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String, Vec<u8>)>, Error> {
                let result = conn.query_row(
                    "SELECT hash, kind, data FROM cache_entries WHERE key = ?1",
                    params![lookup],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((hash, kind, data)) = row else {
            return Ok(None);
        };
        let kind = PayloadKind::parse(&kind).ok_or_else(|| Error::Storage(format!("unknown payload kind: {kind}")))?;

        Ok(Some(CacheEntry { key: key.clone(), hash: ContentHash::new(hash), data: Payload::decode(kind, data)? }))
    }

    /// Number of stored entries.
    pub async fn count_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
