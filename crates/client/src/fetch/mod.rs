//! Network fetch primitive.
//!
//! ### Transport
//! - [`Transport`] is the seam between the cache and the network.
//! - [`HttpTransport`] implements it with reqwest (rustls, compressed bodies).
//! - Responses of every status are returned; callers decide what success is.
//!
//! ### Limits
//! - Max redirects: 5 (configurable)
//! - Max body bytes: 5MB (configurable)
//! - No request timeout: a hung request stays pending.

pub mod request;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, StatusCode, Url, header};
use std::time::Instant;

pub use request::{Request, RequestOptions};
pub use self::url::{UrlError, cache_busted, canonicalize, set_query_param};

use cachefirst_core::{CacheConfig, Error};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "cachefirst/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "cachefirst/0.1".to_string(), max_bytes: 5 * 1024 * 1024, max_redirects: 5 }
    }
}

impl From<&CacheConfig> for FetchConfig {
    fn from(config: &CacheConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, max_redirects: config.max_redirects }
    }
}

/// A fully buffered network response.
///
/// The body is read once into `bytes`; clones of it are cheap, independent
/// views of the same buffer.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The network-fetch primitive the cache sits in front of.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `request` and buffer the whole response.
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error>;
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    http: Client,
    config: FetchConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let method = Method::from_bytes(request.options.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid HTTP method: {}", request.options.method)))?;

        let mut builder = self.http.request(method, url.as_str());
        for (name, value) in &request.options.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.options.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| Error::Transport(format!("network error: {}", e)))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes =
            response.bytes().await.map_err(|e| Error::Transport(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} ({}) in {}ms ({} bytes)", url, final_url, status, fetch_ms, bytes.len());

        Ok(FetchResponse { url, final_url, status, content_type, bytes, headers, fetch_ms })
    }
}
