//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_BASE_URL` - Backend REST root (falls back to `VITE_API_BASE_URL`)
//! - `WS_BASE_URL` - Backend WebSocket root (falls back to `VITE_WS_BASE_URL`)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel (default: `http://localhost:3001`)
//! - `API_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `SEARCH_DEBOUNCE_MS` - Product and user search debounce (default: 400)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use emporium_api::BackendConfig;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, decides the cookie `Secure` flag.
    pub base_url: String,
    pub backend: BackendConfig,
    /// Delay applied to product and user search requests.
    pub search_debounce: Duration,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = get_env_or_default("ADMIN_BASE_URL", "http://localhost:3001");
        Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_BASE_URL".to_string(), e.to_string()))?;

        let api_base_url = get_env_with_fallback("API_BASE_URL", "VITE_API_BASE_URL")?;
        let ws_base_url = get_env_with_fallback("WS_BASE_URL", "VITE_WS_BASE_URL")?;
        let timeout: u64 = parse_env("API_TIMEOUT_SECS", "30")?;
        let backend = BackendConfig::new(&api_base_url, &ws_base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("API_BASE_URL/WS_BASE_URL".to_string(), e.to_string()))?
            .with_timeout(Duration::from_secs(timeout));
        let debounce_ms: u64 = parse_env("SEARCH_DEBOUNCE_MS", "400")?;

        Ok(Self {
            host: parse_env("ADMIN_HOST", "127.0.0.1")?,
            port: parse_env("ADMIN_PORT", "3001")?,
            base_url,
            backend,
            search_debounce: Duration::from_millis(debounce_ms),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Defaults for everything except the backend.
    #[must_use]
    pub fn with_backend(backend: BackendConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            backend,
            search_debounce: emporium_api::debounce::DEFAULT_DELAY,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

fn get_env_with_fallback(key: &str, legacy: &str) -> Result<String, ConfigError> {
    get_optional_env(key)
        .or_else(|| get_optional_env(legacy))
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_bind_admin_port() {
        let config = AdminConfig::with_backend(
            BackendConfig::new("http://localhost:8000/api", "ws://localhost:8000").unwrap(),
        );
        assert_eq!(config.socket_addr().port(), 3001);
        assert!(!config.is_secure());
    }
}
