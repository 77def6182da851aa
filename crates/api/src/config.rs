//! Backend connection settings.
//!
//! The web binaries read these from their own environment and hand a
//! [`BackendConfig`] to [`crate::ApiClient::new`].

use std::time::Duration;

use url::Url;

/// Default HTTP timeout for backend calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the backend lives.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// REST root, e.g. `https://api.example.com/api/`.
    pub api_base_url: Url,
    /// WebSocket root, e.g. `wss://api.example.com/`.
    pub ws_base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    /// Build a config, normalizing both roots to end with `/` so relative
    /// endpoint paths join underneath them instead of replacing the last segment.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL fails to parse, or if the schemes are
    /// not `http(s)` and `ws(s)` respectively.
    pub fn new(api_base_url: &str, ws_base_url: &str) -> Result<Self, url::ParseError> {
        let api_base_url = parse_root(api_base_url)?;
        let ws_base_url = parse_root(ws_base_url)?;

        if !matches!(api_base_url.scheme(), "http" | "https")
            || !matches!(ws_base_url.scheme(), "ws" | "wss")
        {
            return Err(url::ParseError::RelativeUrlWithoutBase);
        }

        Ok(Self {
            api_base_url,
            ws_base_url,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_root(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roots_get_trailing_slash() {
        let config = BackendConfig::new("http://localhost:8000/api", "ws://localhost:8000").unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            config.api_base_url.join("products/").unwrap().as_str(),
            "http://localhost:8000/api/products/"
        );
        assert_eq!(config.ws_base_url.as_str(), "ws://localhost:8000/");
    }

    #[test]
    fn test_scheme_mismatch_rejected() {
        assert!(BackendConfig::new("ws://localhost", "ws://localhost").is_err());
        assert!(BackendConfig::new("http://localhost", "http://localhost").is_err());
        assert!(BackendConfig::new("not a url", "ws://localhost").is_err());
    }
}
