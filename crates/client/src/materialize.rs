//! Response materialization.
//!
//! Turns a buffered response into a [`Payload`] for one of the fixed
//! [`ExtractKind`]s while hashing the body and refreshing the cache entry.
//!
//! The body buffer is duplicated before anything reads it: one view feeds the
//! extraction, the other the content-hash snapshot. The snapshot is always the
//! lossy UTF-8 text of the full body, whatever the extraction kind.

use bytes::Bytes;
use cachefirst_core::cache::{CacheEntry, ContentHash, Fingerprint, Payload, TieredStore, content_hash};
use cachefirst_core::{Error, Tier};

use crate::fetch::FetchResponse;

/// The ways a response body can be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    /// UTF-8 text.
    Text,
    /// A JSON document.
    Json,
    /// Opaque binary data.
    Blob,
    /// The raw body bytes.
    ArrayBuffer,
}

impl ExtractKind {
    pub const ALL: [ExtractKind; 4] = [ExtractKind::Text, ExtractKind::Json, ExtractKind::Blob, ExtractKind::ArrayBuffer];

    /// Tag prepended to the body snapshot when computing the content hash.
    pub fn tag(self) -> &'static str {
        match self {
            ExtractKind::Text => "text",
            ExtractKind::Json => "json",
            ExtractKind::Blob => "blob",
            ExtractKind::ArrayBuffer => "arrayBuffer",
        }
    }

    /// Decode `body` as this kind.
    ///
    /// JSON documents map onto payloads by shape: strings become
    /// [`Payload::Text`], numbers, booleans and null become
    /// [`Payload::Opaque`], and objects and arrays stay [`Payload::Json`].
    pub fn extract(self, body: Bytes) -> Result<Payload, Error> {
        match self {
            ExtractKind::Text => Ok(Payload::Text(String::from_utf8_lossy(&body).into_owned())),
            ExtractKind::Json => {
                let value: serde_json::Value =
                    serde_json::from_slice(&body).map_err(|e| Error::Decode(format!("invalid JSON body: {e}")))?;
                Ok(match value {
                    serde_json::Value::String(s) => Payload::Text(s),
                    value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => Payload::Json(value),
                    scalar => Payload::Opaque(scalar.to_string()),
                })
            }
            ExtractKind::Blob | ExtractKind::ArrayBuffer => Ok(Payload::Binary(body)),
        }
    }
}

/// Result of materializing a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// The body differs from what was cached (or nothing was).
    Changed(Payload),
    /// The body hashes the same as the cached entry.
    Unchanged,
}

/// Extracts payloads for one cache slot.
pub struct Materializer<'a> {
    store: &'a TieredStore,
    key: Fingerprint,
    previous: Option<ContentHash>,
}

impl<'a> Materializer<'a> {
    /// `previous` is the content hash cached for `key` before the request
    /// went out, if any.
    pub fn new(store: &'a TieredStore, key: Fingerprint, previous: Option<ContentHash>) -> Self {
        Self { store, key, previous }
    }

    /// Extract `kind` from `response`, store the result and report whether
    /// it changed.
    ///
    /// The entry is written even when unchanged. Nothing is written when the
    /// body fails to decode.
    pub async fn materialize(self, response: &FetchResponse, kind: ExtractKind) -> Result<Materialized, Error> {
        let (body, snapshot_body) = (response.bytes.clone(), response.bytes.clone());

        let payload = kind.extract(body)?;
        let hash = content_hash(kind.tag(), &String::from_utf8_lossy(&snapshot_body));
        let changed = self.previous.as_ref() != Some(&hash);

        let entry = CacheEntry { key: self.key, hash, data: payload };
        let tier: Tier = self.store.put(&entry).await;
        tracing::debug!(key = %entry.key, kind = kind.tag(), changed, ?tier, "materialized response");

        if changed { Ok(Materialized::Changed(entry.data)) } else { Ok(Materialized::Unchanged) }
    }
}
