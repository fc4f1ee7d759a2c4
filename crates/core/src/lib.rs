//! Core types and storage for cachefirst.
//!
//! This crate provides:
//! - Request fingerprinting and content hashing
//! - The tiered cache store (volatile, small-value, SQLite)
//! - Unified error types
//! - Configuration loading

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheEntry, ContentHash, Descriptor, Fingerprint, Payload, Tier, TieredStore};
pub use config::CacheConfig;
pub use error::Error;
