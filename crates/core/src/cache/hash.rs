//! Request fingerprints and response content hashes.
//!
//! Both are hex-encoded SHA-256 digests. A fingerprint names a cache slot; a
//! content hash only tells two response bodies apart.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use super::entry::{ContentHash, Fingerprint};

/// Anything that can be fingerprinted.
///
/// Canonicalization never fails: inputs without a structured form fall back
/// to their textual rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Null,
    Text(String),
    /// Serialized as canonical JSON. Object keys are emitted in sorted
    /// order, so insertion order does not affect the fingerprint.
    Structured(serde_json::Value),
    /// Decoded as UTF-8 (lossy) before hashing.
    Binary(Bytes),
    /// Pre-rendered text of a value with no better representation.
    Opaque(String),
}

impl Descriptor {
    /// Coerce any displayable value into a descriptor.
    pub fn opaque(value: impl fmt::Display) -> Self {
        Descriptor::Opaque(value.to_string())
    }

    /// Canonical text that gets hashed.
    pub fn canonical(&self) -> Cow<'_, str> {
        match self {
            Descriptor::Null => Cow::Borrowed("null"),
            Descriptor::Text(s) | Descriptor::Opaque(s) => Cow::Borrowed(s),
            Descriptor::Structured(value) => Cow::Owned(value.to_string()),
            Descriptor::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

impl From<&str> for Descriptor {
    fn from(s: &str) -> Self {
        Descriptor::Text(s.to_string())
    }
}

impl From<String> for Descriptor {
    fn from(s: String) -> Self {
        Descriptor::Text(s)
    }
}

impl From<serde_json::Value> for Descriptor {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Descriptor::Null,
            serde_json::Value::String(s) => Descriptor::Text(s),
            other => Descriptor::Structured(other),
        }
    }
}

impl From<Bytes> for Descriptor {
    fn from(bytes: Bytes) -> Self {
        Descriptor::Binary(bytes)
    }
}

impl<T: Into<Descriptor>> From<Option<T>> for Descriptor {
    fn from(value: Option<T>) -> Self {
        value.map_or(Descriptor::Null, Into::into)
    }
}

/// Compute the cache key for a request descriptor.
pub fn fingerprint(input: &Descriptor) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(input.canonical().as_bytes());
    Fingerprint::new(hex::encode(hasher.finalize()))
}

/// Compute the change-detection hash of a response body snapshot.
///
/// The extraction tag is prepended so the same body read as text and as JSON
/// hashes differently.
pub fn content_hash(kind_tag: &str, snapshot: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(kind_tag.as_bytes());
    hasher.update(snapshot.as_bytes());
    ContentHash::new(hex::encode(hasher.finalize()))
}
