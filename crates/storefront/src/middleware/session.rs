//! Session middleware configuration.
//!
//! Sessions live in process memory; the backend owns all durable state, so a
//! restart only signs browsers out.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::models::session_keys;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "emporium_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Stable per-browser key used to debounce that browser's requests.
///
/// Generated on first use; falls back to a throwaway key if the session
/// cannot be written, which simply disables coalescing for that request.
pub async fn debounce_key(session: &Session) -> String {
    if let Ok(Some(key)) = session.get::<String>(session_keys::DEBOUNCE_KEY).await {
        return key;
    }

    let key = Uuid::new_v4().to_string();
    if let Err(e) = session.insert(session_keys::DEBOUNCE_KEY, &key).await {
        tracing::warn!(error = %e, "failed to store debounce key");
    }
    key
}
