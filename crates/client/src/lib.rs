//! Cache-first fetching for cachefirst.
//!
//! This crate wraps an HTTP transport with the stale-while-revalidate
//! coordinator: cached data is handed out immediately, the network is always
//! asked, and callers hear about fresh data only when its content changed.

pub mod fetch;
pub mod materialize;
pub mod swr;

pub use fetch::{FetchConfig, FetchResponse, HttpTransport, Request, RequestOptions, Transport};
pub use materialize::{ExtractKind, Materialized, Materializer};
pub use swr::{CacheFirst, Chooser, ErrorHandler, Outcome, Revalidation, Update};
