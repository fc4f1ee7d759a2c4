//! Response cache storage.
//!
//! Entries are addressed by a request [`Fingerprint`] and live in exactly one
//! of three tiers:
//!
//! - a volatile in-process map
//! - a small-value JSON namespace for short text and JSON objects
//! - a durable SQLite table (tokio-rusqlite) for everything else

pub mod connection;
pub mod entries;
pub mod entry;
pub mod hash;
pub mod kv;
pub mod memory;
pub mod migrations;
pub mod tiered;

pub use crate::Error;

pub use connection::DurableTier;
pub use entry::{CacheEntry, ContentHash, Fingerprint, InlineRecord, MAX_INLINE_CHARS, Payload, PayloadKind};
pub use hash::{Descriptor, content_hash, fingerprint};
pub use kv::KvTier;
pub use memory::MemoryTier;
pub use tiered::{Tier, TieredStore};
