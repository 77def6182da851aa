//! The admin role gate: admins get the dashboard, everyone else is counted
//! and blocked on the third attempt.

#![allow(clippy::unwrap_used)]

use emporium_integration_tests::{
    ADMIN_EMAIL, MockBackend, SHOPPER_EMAIL, browser, sign_in, spawn_admin,
};
use reqwest::{StatusCode, header};

#[tokio::test]
async fn test_admin_sees_dashboard() {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_admin(&backend).await.unwrap();
    let client = browser().unwrap();

    let response = sign_in(&client, &base, ADMIN_EMAIL).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("1,234.56"));
    assert!(html.contains("Welcome"));
    assert_eq!(backend.calls("GET", "/api/admin/dashboard/"), 1);
}

#[tokio::test]
async fn test_non_admin_is_blocked_after_three_attempts() {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_admin(&backend).await.unwrap();
    let client = browser().unwrap();
    sign_in(&client, &base, SHOPPER_EMAIL).await.unwrap();

    let first = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::FORBIDDEN);
    assert!(first.text().await.unwrap().contains("2 more attempts"));

    let second = client.get(format!("{base}/orders")).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
    assert!(second.text().await.unwrap().contains("1 more attempt "));
    assert_eq!(backend.calls("POST", "/api/users/block/"), 0);

    let third = client.get(format!("{base}/products")).send().await.unwrap();
    assert_eq!(third.status(), StatusCode::SEE_OTHER);
    assert_eq!(third.headers()[header::LOCATION], "/auth/login");
    assert_eq!(backend.calls("POST", "/api/users/block/"), 1);
    assert_eq!(backend.calls("POST", "/api/users/logout/"), 1);
    assert_eq!(backend.calls("GET", "/api/admin/dashboard/"), 0);

    // Signed out: the login page explains why, and the dashboard is closed.
    let login = client.get(format!("{base}/auth/login")).send().await.unwrap();
    assert!(login.text().await.unwrap().contains("has been blocked"));

    let after = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(backend.calls("POST", "/api/users/block/"), 1);
}

#[tokio::test]
async fn test_htmx_attempts_are_redirected_by_header() {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_admin(&backend).await.unwrap();
    let client = browser().unwrap();

    let response = client
        .get(format!("{base}/users/search?search=asha"))
        .header("hx-request", "true")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["hx-redirect"], "/auth/login");
    assert_eq!(backend.calls("GET", "/api/admin/users/"), 0);
}

#[tokio::test]
async fn test_admin_visits_never_count_as_attempts() {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_admin(&backend).await.unwrap();
    let client = browser().unwrap();
    sign_in(&client, &base, ADMIN_EMAIL).await.unwrap();

    for path in ["/", "/orders", "/products", "/users", "/"] {
        let response = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    assert_eq!(backend.calls("POST", "/api/users/block/"), 0);

    // Same browser, now a shopper: the first strike is still the first.
    let response = client
        .post(format!("{base}/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    sign_in(&client, &base, SHOPPER_EMAIL).await.unwrap();

    let first = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::FORBIDDEN);
    assert!(first.text().await.unwrap().contains("2 more attempts"));
    assert_eq!(backend.calls("POST", "/api/users/block/"), 0);
}

#[tokio::test]
async fn test_rejected_replay_leaves_admin_login_reachable() {
    let backend = MockBackend::start().await.unwrap();
    let base = spawn_admin(&backend).await.unwrap();
    let client = browser().unwrap();
    sign_in(&client, &base, ADMIN_EMAIL).await.unwrap();
    backend.reject_bearers();

    let response = client.get(format!("{base}/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/auth/login");

    let login = client.get(format!("{base}/auth/login")).send().await.unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    assert!(login.text().await.unwrap().contains("name=\"password\""));
    assert_eq!(backend.calls("POST", "/api/users/block/"), 0);
}
