//! Toasts carried across a redirect.

use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a toast for the next page.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut pending = session
        .get::<Vec<Flash>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);

    if let Err(e) = session.insert(session_keys::FLASH, pending).await {
        tracing::warn!(error = %e, "failed to store flash message");
    }
}

/// Take and clear all pending toasts.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
