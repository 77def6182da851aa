//! One-shot toast messages kept in the session.

use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a toast for the next render.
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flashes_are_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        push_flash(&session, Flash::success("Added to cart")).await;
        push_flash(&session, Flash::error("Out of stock")).await;

        let shown = take_flashes(&session).await;
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].message, "Out of stock");
        assert!(take_flashes(&session).await.is_empty());
    }
}
