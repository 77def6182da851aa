//! Emporium API - client for the external commerce backend.
//!
//! Wraps the backend's REST endpoints and notification WebSocket behind typed
//! methods. Credentials live in a caller-supplied [`TokenStore`]; requests made
//! through [`ApiClient::session`] attach the bearer token and transparently
//! refresh it once on a 401.
//!
//! # Example
//!
//! ```rust,ignore
//! use emporium_api::{ApiClient, BackendConfig, MemoryTokenStore};
//!
//! let client = ApiClient::new(&BackendConfig::new(api_url, ws_url)?)?;
//! let store = MemoryTokenStore::default();
//! client.login(&store, "asha@example.com", "secret").await?;
//! let cart = client.session(&store).cart().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
mod cache;
mod client;
pub mod config;
pub mod debounce;
pub mod endpoints;
mod error;

pub use auth::{AuthTokens, MemoryTokenStore, REFRESH_COOKIE, SessionEvent, TokenStore};
pub use client::{ApiClient, Authed, REFRESH_PATH};
pub use config::BackendConfig;
pub use debounce::Debouncer;
pub use endpoints::admin::{BannerInput, BrandInput, CouponInput, DashboardStats, ProductInput};
pub use endpoints::auth::{ProfileUpdate, Registration};
pub use endpoints::catalog::{Ordering, ProductFilter};
pub use endpoints::notifications::NotificationStream;
pub use endpoints::orders::NewOrder;
pub use error::{ApiError, describe_error_body};
pub use reqwest::StatusCode;
