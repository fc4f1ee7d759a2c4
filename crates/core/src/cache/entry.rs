//! Cache entry and payload types.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Payloads whose JSON form is shorter than this many UTF-16 code units may
/// live in the small-value tier.
pub const MAX_INLINE_CHARS: usize = 10_000;

/// Hex-encoded SHA-256 of a canonicalized request descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn new(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded SHA-256 of an extraction tag followed by a body snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub(crate) fn new(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded response data held by a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
    Binary(Bytes),
    /// A value that only survives as its string rendering.
    Opaque(String),
}

/// Storage tag of a [`Payload`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Text,
    Json,
    Binary,
    Opaque,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Json => "json",
            PayloadKind::Binary => "binary",
            PayloadKind::Opaque => "opaque",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "text" => Some(PayloadKind::Text),
            "json" => Some(PayloadKind::Json),
            "binary" => Some(PayloadKind::Binary),
            "opaque" => Some(PayloadKind::Opaque),
            _ => None,
        }
    }
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Text(_) => PayloadKind::Text,
            Payload::Json(_) => PayloadKind::Json,
            Payload::Binary(_) => PayloadKind::Binary,
            Payload::Opaque(_) => PayloadKind::Opaque,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) | Payload::Opaque(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form used by the small-value tier.
    ///
    /// Only text and JSON objects have one; everything else is routed to the
    /// large-value tier.
    pub fn to_inline(&self) -> Option<serde_json::Value> {
        match self {
            Payload::Text(s) => Some(serde_json::Value::String(s.clone())),
            Payload::Json(value @ serde_json::Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Inverse of [`Payload::to_inline`].
    pub fn from_inline(value: serde_json::Value) -> Result<Self, Error> {
        match value {
            serde_json::Value::String(s) => Ok(Payload::Text(s)),
            value @ serde_json::Value::Object(_) => Ok(Payload::Json(value)),
            other => Err(Error::Storage(format!("unexpected inline payload: {other}"))),
        }
    }

    /// Byte form used by the large-value tier.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Payload::Text(s) | Payload::Opaque(s) => s.as_bytes().to_vec(),
            Payload::Json(value) => value.to_string().into_bytes(),
            Payload::Binary(bytes) => bytes.to_vec(),
        }
    }

    /// Inverse of [`Payload::encode`].
    pub fn decode(kind: PayloadKind, data: Vec<u8>) -> Result<Self, Error> {
        let text = |data: Vec<u8>| String::from_utf8(data).map_err(|e| Error::Storage(format!("invalid utf-8: {e}")));
        match kind {
            PayloadKind::Text => Ok(Payload::Text(text(data)?)),
            PayloadKind::Opaque => Ok(Payload::Opaque(text(data)?)),
            PayloadKind::Json => Ok(Payload::Json(serde_json::from_slice(&data)?)),
            PayloadKind::Binary => Ok(Payload::Binary(Bytes::from(data))),
        }
    }
}

/// A cached response: the request fingerprint, the last observed content
/// hash and the decoded data. Replaced wholesale on every write.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: Fingerprint,
    pub hash: ContentHash,
    pub data: Payload,
}

/// Serialized record stored in the small-value tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineRecord {
    pub hash: ContentHash,
    pub data: serde_json::Value,
}

impl InlineRecord {
    /// Build the small-tier record for an entry, or `None` when the entry
    /// belongs in the large-value tier.
    pub fn for_entry(entry: &CacheEntry) -> Option<Self> {
        let data = entry.data.to_inline()?;
        let units = data.to_string().encode_utf16().count();
        if units >= MAX_INLINE_CHARS {
            tracing::debug!(key = %entry.key, units, "payload too large for small-value tier");
            return None;
        }
        Some(Self { hash: entry.hash.clone(), data })
    }

    pub fn into_entry(self, key: Fingerprint) -> Result<CacheEntry, Error> {
        Ok(CacheEntry { key, hash: self.hash, data: Payload::from_inline(self.data)? })
    }
}
