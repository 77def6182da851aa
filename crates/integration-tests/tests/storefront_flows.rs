//! Storefront flows driven over HTTP like a browser with HTMX would.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use emporium_integration_tests::{
    MockBackend, SHOPPER_EMAIL, VALID_COUPON, browser, sign_in, spawn_storefront,
};
use reqwest::{StatusCode, header};

async fn shopper() -> (MockBackend, String, reqwest::Client) {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_storefront(&backend).await.unwrap();
    let client = browser().unwrap();

    let response = sign_in(&client, &base, SHOPPER_EMAIL).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    (backend, base, client)
}

async fn htmx_post(
    client: &reqwest::Client,
    url: String,
    form: &[(&str, &str)],
) -> (StatusCode, String) {
    let response = client
        .post(url)
        .header("hx-request", "true")
        .form(form)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_wrong_password_rerenders_login_with_toast() {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_storefront(&backend).await.unwrap();
    let client = browser().unwrap();

    let response = client
        .post(format!("{base}/auth/login"))
        .form(&[("email", SHOPPER_EMAIL), ("password", "hunter2")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("No active account found with the given credentials"));
    assert!(html.contains(SHOPPER_EMAIL));
}

#[tokio::test]
async fn test_wishlist_toggle_adds_optimistically() {
    let (backend, base, client) = shopper().await;

    let (status, html) = htmx_post(&client, format!("{base}/wishlist/toggle"), &[("product_id", "5")]).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("aria-pressed=\"true\""));
    assert!(html.contains("Added to wishlist"));
    assert_eq!(backend.calls("POST", "/api/wishlist/"), 1);
}

#[tokio::test]
async fn test_rejected_wishlist_toggle_rolls_back() {
    let (backend, base, client) = shopper().await;
    backend.reject_wishlist();

    let (status, html) = htmx_post(&client, format!("{base}/wishlist/toggle"), &[("product_id", "5")]).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("aria-pressed=\"false\""));
    assert!(html.contains("This product is no longer available"));
    assert!(html.contains("hx-swap-oob"));

    // The rolled-back copy is what the next toggle starts from.
    let (_, html) = htmx_post(&client, format!("{base}/wishlist/toggle"), &[("product_id", "5")]).await;
    assert!(html.contains("aria-pressed=\"false\""));
    assert_eq!(backend.calls("POST", "/api/wishlist/"), 2);
    assert_eq!(backend.calls("GET", "/api/wishlist/"), 1);
}

#[tokio::test]
async fn test_invalid_coupon_shows_error_toast() {
    let (backend, base, client) = shopper().await;

    let (status, html) = htmx_post(&client, format!("{base}/checkout/coupon"), &[("code", "BOGUS")]).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Invalid coupon code"));
    assert!(html.contains("hx-swap-oob"));
    assert_eq!(backend.calls("POST", "/api/orders/apply-coupon/"), 1);
}

#[tokio::test]
async fn test_valid_coupon_is_applied() {
    let (_backend, base, client) = shopper().await;

    let (status, html) = htmx_post(&client, format!("{base}/checkout/coupon"), &[("code", VALID_COUPON)]).await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains(&format!("Coupon {VALID_COUPON} applied")));
}

#[tokio::test]
async fn test_blank_coupon_never_reaches_backend() {
    let (backend, base, client) = shopper().await;

    let (_, html) = htmx_post(&client, format!("{base}/checkout/coupon"), &[("code", "  ")]).await;

    assert!(html.contains("Enter a coupon code"));
    assert_eq!(backend.calls("POST", "/api/orders/apply-coupon/"), 0);
}

#[tokio::test]
async fn test_notification_stream_relays_backend_socket() {
    let (backend, base, client) = shopper().await;

    let mut response = client
        .get(format!("{base}/notifications/stream"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.notify(21, "Order 21 has shipped"), 1);

    let mut body = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !body.contains("Order 21 has shipped") {
            let chunk = response.chunk().await.unwrap().unwrap();
            body.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap();
    assert!(body.contains("event: notification"));
}

#[tokio::test]
async fn test_logout_ends_backend_session() {
    let (backend, base, client) = shopper().await;

    let response = client
        .post(format!("{base}/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(backend.calls("POST", "/api/users/logout/"), 1);

    let response = client.get(format!("{base}/cart")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");
}

#[tokio::test]
async fn test_expired_session_sends_user_to_login() {
    let (backend, base, client) = shopper().await;
    backend.expire_access();
    backend.revoke_refresh();

    let response = client.get(format!("{base}/cart")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");
    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 1);
}

#[tokio::test]
async fn test_rejected_replay_leaves_login_reachable() {
    let (backend, base, client) = shopper().await;
    backend.reject_bearers();

    let response = client.get(format!("{base}/cart")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");
    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 1);

    // The session no longer holds a user, so the login form renders instead
    // of bouncing back to the page that just failed.
    let login = client.get(format!("{base}/auth/login")).send().await.unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    assert!(login.text().await.unwrap().contains("name=\"password\""));

    let again = client.get(format!("{base}/cart")).send().await.unwrap();
    assert_eq!(again.status(), StatusCode::SEE_OTHER);
    assert_eq!(again.headers()[header::LOCATION], "/auth/login");
    assert_eq!(backend.calls("POST", "/api/users/token/refresh/"), 1);
}
