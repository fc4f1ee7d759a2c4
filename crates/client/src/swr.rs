//! Stale-while-revalidate coordination.
//!
//! Each call runs the network request and the cache lookup side by side. The
//! request is started first, so it is in flight by the time cached data is
//! handed out:
//!
//! 1. The request always goes to the network, with a cache-busting timestamp
//!    on its URL.
//! 2. If an entry is cached for the request fingerprint, the callback gets it
//!    right away with `fresh == false`, without waiting for the network.
//! 3. A transport failure or non-success status goes to the error handler and
//!    ends the call. The store is not touched.
//! 4. Otherwise the response is materialized. The callback fires a second time
//!    with `fresh == true` only if the content hash changed.
//!
//! The stale callback always runs before the fresh one. Calls sharing a
//! fingerprint are not coordinated; see [`TieredStore`].

use std::fmt;
use std::sync::Arc;

use cachefirst_core::{CacheConfig, Error, Payload, TieredStore};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fetch::{FetchConfig, FetchResponse, HttpTransport, Request, RequestOptions, Transport};
use crate::materialize::{ExtractKind, Materialized, Materializer};

/// Receives failures of a revalidation.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

fn log_error() -> ErrorHandler {
    Arc::new(|err: &Error| tracing::error!(error = %err, "cache revalidation failed"))
}

/// One delivery to a data callback.
#[derive(Debug)]
pub struct Update<'a> {
    pub data: Payload,
    /// `false` for the cached copy, `true` for data confirmed by the network.
    pub fresh: bool,
    /// The network response behind fresh data.
    pub response: Option<&'a FetchResponse>,
}

/// How a revalidation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fresh data was delivered.
    Updated,
    /// The network confirmed the cached content; nothing fresh was delivered.
    Unchanged,
    /// The error handler was invoked.
    Failed,
}

/// Cache-first client: serves cached responses, then revalidates them.
#[derive(Clone)]
pub struct CacheFirst {
    store: Arc<TieredStore>,
    transport: Arc<dyn Transport>,
    cache_buster_param: String,
    on_error: ErrorHandler,
}

impl fmt::Debug for CacheFirst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFirst")
            .field("store", &self.store)
            .field("cache_buster_param", &self.cache_buster_param)
            .finish_non_exhaustive()
    }
}

impl CacheFirst {
    pub fn new(store: Arc<TieredStore>, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport, cache_buster_param: "userLocalTime".into(), on_error: log_error() }
    }

    /// Build a client from configuration: open the store (falling back to
    /// memory) and an HTTP transport.
    ///
    /// The configuration is validated first; a rejected value is reported as
    /// [`Error::InvalidInput`].
    pub async fn from_config(config: &CacheConfig) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let store = TieredStore::open(config).await;
        let transport = HttpTransport::new(FetchConfig::from(config))?;
        Ok(Self::new(Arc::new(store), Arc::new(transport)).with_cache_buster_param(&config.cache_buster_param))
    }

    pub fn with_cache_buster_param(mut self, param: &str) -> Self {
        self.cache_buster_param = param.to_string();
        self
    }

    /// Replace the default error handler used by calls that don't set one.
    pub fn with_error_handler(mut self, handler: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(handler);
        self
    }

    pub fn store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    /// Start a cached fetch of `target`.
    ///
    /// Fails only if `target` is not a usable URL.
    pub fn fetch(&self, target: &str, options: RequestOptions) -> Result<Chooser, Error> {
        Ok(self.request(Request::new(target, options)?))
    }

    /// Start a cached fetch of an already built request.
    pub fn request(&self, request: Request) -> Chooser {
        Chooser { client: self.clone(), request }
    }
}

/// Picks how the response body is read.
#[derive(Debug)]
pub struct Chooser {
    client: CacheFirst,
    request: Request,
}

impl Chooser {
    pub fn text<F>(self, on_update: F) -> Revalidation<F>
    where
        F: FnMut(Update<'_>) + Send,
    {
        self.extract(ExtractKind::Text, on_update)
    }

    pub fn json<F>(self, on_update: F) -> Revalidation<F>
    where
        F: FnMut(Update<'_>) + Send,
    {
        self.extract(ExtractKind::Json, on_update)
    }

    pub fn blob<F>(self, on_update: F) -> Revalidation<F>
    where
        F: FnMut(Update<'_>) + Send,
    {
        self.extract(ExtractKind::Blob, on_update)
    }

    pub fn array_buffer<F>(self, on_update: F) -> Revalidation<F>
    where
        F: FnMut(Update<'_>) + Send,
    {
        self.extract(ExtractKind::ArrayBuffer, on_update)
    }

    pub fn extract<F>(self, kind: ExtractKind, on_update: F) -> Revalidation<F>
    where
        F: FnMut(Update<'_>) + Send,
    {
        Revalidation { client: self.client, request: self.request, kind, on_update, on_error: None }
    }
}

/// A configured revalidation, started with [`run`](Self::run) or
/// [`spawn`](Self::spawn).
pub struct Revalidation<F> {
    client: CacheFirst,
    request: Request,
    kind: ExtractKind,
    on_update: F,
    on_error: Option<ErrorHandler>,
}

impl<F> Revalidation<F>
where
    F: FnMut(Update<'_>) + Send,
{
    /// Handle failures of this call instead of the client's default handler.
    pub fn on_error(mut self, handler: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Drive the call to completion.
    pub async fn run(self) -> Outcome {
        let Self { client, request, kind, mut on_update, on_error } = self;
        let on_error = on_error.unwrap_or_else(|| client.on_error.clone());

        let key = request.fingerprint();
        let target = request.cache_busted(&client.cache_buster_param);

        let lookup = async {
            let Some(cached) = client.store.get(&key).await else {
                debug!(%key, "no cached response");
                return None;
            };
            debug!(%key, "serving cached response");
            on_update(Update { data: cached.data, fresh: false, response: None });
            Some(cached.hash)
        };
        let (fetched, previous) = tokio::join!(client.transport.fetch(&target), lookup);

        let response = match fetched {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                on_error(&Error::HttpStatus { status: response.status.as_u16(), url: request.url.to_string() });
                return Outcome::Failed;
            }
            Err(e) => {
                on_error(&e);
                return Outcome::Failed;
            }
        };

        match Materializer::new(&client.store, key, previous).materialize(&response, kind).await {
            Ok(Materialized::Changed(data)) => {
                on_update(Update { data, fresh: true, response: Some(&response) });
                Outcome::Updated
            }
            Ok(Materialized::Unchanged) => Outcome::Unchanged,
            Err(e) => {
                on_error(&e);
                Outcome::Failed
            }
        }
    }

    /// Run the call on the tokio runtime in the background.
    pub fn spawn(self) -> JoinHandle<Outcome>
    where
        F: 'static,
    {
        tokio::spawn(self.run())
    }
}
