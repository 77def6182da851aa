//! Application state shared across handlers.

use std::sync::Arc;

use emporium_api::{ApiClient, ApiError, Debouncer};

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    api: ApiClient,
    debouncer: Debouncer<String>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.backend)?;
        let debouncer = Debouncer::new(config.search_debounce);
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                debouncer,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Search debouncer, keyed by browser and list.
    #[must_use]
    pub fn debouncer(&self) -> &Debouncer<String> {
        &self.inner.debouncer
    }
}
