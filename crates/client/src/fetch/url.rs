//! URL canonicalization and cache busting.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string so equivalent targets share a fingerprint.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str().map(str::to_lowercase) {
        parsed.set_host(Some(&host)).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Set query parameter `name` to `value`, replacing any existing occurrences
/// and keeping the other parameters in order.
pub fn set_query_param(url: &mut url::Url, name: &str, value: &str) {
    let kept: Vec<(String, String)> =
        url.query_pairs().filter(|(key, _)| key != name).map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (key, val) in &kept {
        pairs.append_pair(key, val);
    }
    pairs.append_pair(name, value);
}

/// Return a copy of `url` carrying a client timestamp in `param`, so no
/// intermediate cache can answer the request.
pub fn cache_busted(url: &url::Url, param: &str) -> url::Url {
    let mut busted = url.clone();
    set_query_param(&mut busted, param, &chrono::Local::now().to_rfc3339());
    busted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_basic() {
        let url = canonicalize("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://EXAMPLE.COM/Path").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/Path");
    }

    #[test]
    fn test_canonicalize_remove_fragment_preserve_query() {
        let url = canonicalize("  https://example.com/a?b=2&a=1#section  ").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_errors() {
        assert!(matches!(canonicalize("   "), Err(UrlError::Empty)));
        assert!(matches!(canonicalize("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(_))));
        assert!(matches!(canonicalize("https://"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_set_query_param_replaces_existing() {
        let mut url = url::Url::parse("https://example.com/?ts=old&q=rust&ts=older").unwrap();
        set_query_param(&mut url, "ts", "new");
        assert_eq!(url.query(), Some("q=rust&ts=new"));
    }

    #[test]
    fn test_cache_busted_leaves_original_untouched() {
        let url = url::Url::parse("https://example.com/api?q=1").unwrap();
        let busted = cache_busted(&url, "userLocalTime");

        assert_eq!(url.query(), Some("q=1"));
        let pairs: Vec<_> = busted.query_pairs().collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "q");
        assert_eq!(pairs[1].0, "userLocalTime");
        assert!(!pairs[1].1.is_empty());
    }
}
