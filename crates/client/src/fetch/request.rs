//! Request descriptors: a target plus fetch options.

use std::collections::BTreeMap;

use bytes::Bytes;
use cachefirst_core::{Descriptor, Error, Fingerprint, cache::fingerprint};
use serde_json::json;
use url::Url;

use super::url::{cache_busted, canonicalize};

/// Options accompanying a fetch target.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    /// HTTP method, upper-cased.
    pub method: String,
    /// Header names are lower-cased; later values for the same name win.
    pub headers: BTreeMap<String, String>,
    pub body: Option<Bytes>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { method: "GET".into(), headers: BTreeMap::new(), body: None }
    }
}

impl RequestOptions {
    pub fn method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_uppercase();
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A canonicalized fetch target with its options.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: Url,
    pub options: RequestOptions,
}

impl Request {
    /// Build a request from a target string and options.
    pub fn new(target: &str, options: RequestOptions) -> Result<Self, Error> {
        let url = canonicalize(target).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { url, options })
    }

    /// A plain GET for `target`.
    pub fn get(target: &str) -> Result<Self, Error> {
        Self::new(target, RequestOptions::default())
    }

    /// Structured form of this request used for fingerprinting.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor::Structured(json!({
            "url": self.url.as_str(),
            "method": self.options.method,
            "headers": self.options.headers,
            "body": self.options.body.as_ref().map(|b| String::from_utf8_lossy(b)),
        }))
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.descriptor())
    }

    /// Copy of this request whose URL carries a fresh timestamp in `param`.
    pub fn cache_busted(&self, param: &str) -> Self {
        Self { url: cache_busted(&self.url, param), options: self.options.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = Request::get("https://example.com/api").unwrap();
        let b = Request::get("https://example.com/api").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_canonicalized_differences() {
        let a = Request::get("https://EXAMPLE.com/api#top").unwrap();
        let b = Request::get(" example.com/api ").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_header_order_irrelevant() {
        let a = Request::new("https://example.com", RequestOptions::default().header("A", "1").header("b", "2"))
            .unwrap();
        let b = Request::new("https://example.com", RequestOptions::default().header("B", "2").header("a", "1"))
            .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_varies_with_options() {
        let get = Request::get("https://example.com/api").unwrap();
        let post = Request::new("https://example.com/api", RequestOptions::default().method("post")).unwrap();
        let with_body =
            Request::new("https://example.com/api", RequestOptions::default().method("post").body("{}")).unwrap();

        assert_eq!(post.options.method, "POST");
        assert_ne!(get.fingerprint(), post.fingerprint());
        assert_ne!(post.fingerprint(), with_body.fingerprint());
    }

    #[test]
    fn test_cache_busted_keeps_fingerprint_source() {
        let request = Request::get("https://example.com/api").unwrap();
        let busted = request.cache_busted("userLocalTime");

        assert_ne!(busted.url, request.url);
        assert_eq!(busted.options, request.options);
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_invalid_target() {
        assert!(matches!(Request::get(""), Err(Error::InvalidUrl(_))));
    }
}
