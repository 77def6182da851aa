//! Emporium storefront library.
//!
//! The storefront is exposed as a library so the router can be driven
//! in-process by integration tests. The binary in `main.rs` adds tracing,
//! Sentry and the listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod layout;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod views;

use axum::{Router, extract::Request, routing::get};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Directory served under `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/storefront/static";

/// Build the full storefront router: pages, static assets, sessions,
/// request IDs and request tracing.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(axum::middleware::from_fn(middleware::htmx_login_redirect))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use emporium_api::BackendConfig;
    use tower::ServiceExt;

    use super::*;
    use crate::config::StorefrontConfig;

    fn test_app() -> Router {
        // Nothing listens here; these routes must not reach the backend.
        let backend = BackendConfig::new("http://127.0.0.1:9/api", "ws://127.0.0.1:9").unwrap();
        app(AppState::new(StorefrontConfig::with_backend(backend)).unwrap())
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_echoes_request_id() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_signed_out_cart_redirects_to_login() {
        let response = test_app().oneshot(get("/cart")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/auth/login");
    }

    #[tokio::test]
    async fn test_htmx_requests_get_hx_redirect() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/wishlist/toggle")
                    .header("hx-request", "true")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("product_id=3"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["hx-redirect"], "/auth/login");
    }

    #[tokio::test]
    async fn test_signed_out_cart_count_is_zero() {
        let response = test_app().oneshot(get("/cart/count")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains('0'));
    }
}
