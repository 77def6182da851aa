//! Session middleware configuration for admin.
//!
//! Sessions are kept in memory with stricter settings than the storefront
//! (SameSite=Strict, 24hr expiry).

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use crate::config::AdminConfig;
use crate::models::session_keys;

/// Session cookie name for admin.
pub const SESSION_COOKIE_NAME: &str = "emporium_admin_session";

/// Session expiry time in seconds (24 hours - stricter than storefront).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &AdminConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        // SameSite=Strict for admin (stricter than storefront's Lax)
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}

/// Stable per-browser key for the search debouncer.
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
