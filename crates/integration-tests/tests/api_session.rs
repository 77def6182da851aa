//! Token refresh, logout and the notification socket, exercised through
//! `emporium-api` against the mock backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use emporium_api::{ApiClient, ApiError, MemoryTokenStore, SessionEvent, TokenStore};
use emporium_core::NotificationId;
use emporium_integration_tests::{MockBackend, PASSWORD, REFRESH_VALUE, SHOPPER_EMAIL};

async fn signed_in() -> (MockBackend, ApiClient, MemoryTokenStore) {
    let backend = MockBackend::start().await.unwrap();
    let client = ApiClient::new(&backend.config().unwrap()).unwrap();
    let store = MemoryTokenStore::default();
    client.login(&store, SHOPPER_EMAIL, PASSWORD).await.unwrap();
    store.set_subject("7").await;
    (backend, client, store)
}

#[tokio::test]
async fn test_login_keeps_access_token_and_refresh_cookie() {
    let (backend, _client, store) = signed_in().await;
    assert_eq!(store.access_token().await, Some(backend.current_access()));
    assert_eq!(store.refresh_token().await.as_deref(), Some(REFRESH_VALUE));
}

#[tokio::test]
async fn test_wrong_password_is_a_user_facing_error() {
    let backend = MockBackend::start().await.unwrap();
    let client = ApiClient::new(&backend.config().unwrap()).unwrap();
    let store = MemoryTokenStore::default();

    let err = client.login(&store, SHOPPER_EMAIL, "hunter2").await.unwrap_err();
    assert!(!err.is_auth());
    assert_eq!(
        err.user_message(),
        "No active account found with the given credentials"
    );
    assert!(store.load().await.is_empty());
}

#[tokio::test]
async fn test_rejected_access_token_refreshes_once_and_replays() {
    let (backend, client, store) = signed_in().await;
    let mut events = client.subscribe_events();
    backend.expire_access();

    let cart = client.session(&store).cart().await.unwrap();

    assert_eq!(cart.item_count(), 2);
    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 1);
    assert_eq!(backend.calls("GET", "/api/cart/"), 2);
    assert_eq!(store.access_token().await, Some(backend.current_access()));
    // The refresh cookie was not rotated, so the old one is kept.
    assert_eq!(store.refresh_token().await.as_deref(), Some(REFRESH_VALUE));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Refreshed {
            subject: Some("7".to_string())
        }
    );
}

#[tokio::test]
async fn test_failed_refresh_expires_the_session() {
    let (backend, client, store) = signed_in().await;
    let mut events = client.subscribe_events();
    backend.expire_access();
    backend.revoke_refresh();

    let err = client.session(&store).cart().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(store.load().await.is_empty());
    assert_eq!(backend.calls("GET", "/api/cart/"), 1);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            subject: Some("7".to_string()),
            reason: "token refresh failed".to_string(),
        }
    );
}

#[tokio::test]
async fn test_rejection_after_refresh_ends_the_session() {
    let (backend, client, store) = signed_in().await;
    let mut events = client.subscribe_events();
    backend.reject_bearers();

    let err = client.session(&store).wishlist().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 1);
    assert_eq!(backend.calls("GET", "/api/wishlist/"), 2);
    assert!(store.load().await.is_empty());

    // The refresh itself succeeded before the replay was rejected.
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Refreshed { .. }
    ));
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            subject: Some("7".to_string()),
            reason: "access token rejected after refresh".to_string(),
        }
    );
}

#[tokio::test]
async fn test_signed_out_store_never_refreshes() {
    let backend = MockBackend::start().await.unwrap();
    let client = ApiClient::new(&backend.config().unwrap()).unwrap();
    let store = MemoryTokenStore::default();
    let mut events = client.subscribe_events();

    let err = client.session(&store).cart().await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_logout_clears_store_and_broadcasts() {
    let (backend, client, store) = signed_in().await;
    let mut events = client.subscribe_events();

    client.session(&store).logout().await;

    assert!(store.load().await.is_empty());
    assert_eq!(backend.calls("POST", "/api/users/logout/"), 1);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            subject: Some("7".to_string()),
            reason: "signed out".to_string(),
        }
    );
}

#[tokio::test]
async fn test_notification_socket_delivers_frames() {
    let (backend, client, store) = signed_in().await;
    let mut stream = client
        .session(&store)
        .subscribe_notifications()
        .await
        .unwrap();

    assert_eq!(backend.notify(11, "Your order has shipped"), 1);

    let notification = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(notification.id, NotificationId::new(11));
    assert_eq!(notification.message, "Your order has shipped");
    assert!(!notification.is_read);

    stream.close().await;
}

#[tokio::test]
async fn test_notification_socket_refreshes_a_rejected_token() {
    let (backend, client, store) = signed_in().await;
    backend.expire_access();

    let stream = client
        .session(&store)
        .subscribe_notifications()
        .await
        .unwrap();

    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 1);
    assert_eq!(backend.calls("GET", "/ws/notifications/"), 2);
    assert_eq!(store.access_token().await, Some(backend.current_access()));
    stream.close().await;
}

#[tokio::test]
async fn test_notification_socket_gives_up_when_refresh_fails() {
    let (backend, client, store) = signed_in().await;
    backend.expire_access();
    backend.revoke_refresh();

    let result = client.session(&store).subscribe_notifications().await;

    assert!(matches!(result, Err(ApiError::SessionExpired)));
    assert_eq!(backend.calls("GET", "/ws/notifications/"), 1);
}
