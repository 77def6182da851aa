//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /health                        - Health check
//!
//! # Catalogue
//! GET  /shop                          - Listing with filter form
//! GET  /shop/results                  - Filtered results fragment (HTMX, debounced)
//! GET  /products/{id}                 - Product detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add to cart (toasts, triggers cart-updated)
//! POST /cart/update                   - Update quantity (returns cart_items fragment)
//! POST /cart/remove                   - Remove item (returns cart_items fragment)
//! GET  /cart/count                    - Cart count badge (fragment)
//!
//! # Wishlist
//! GET  /wishlist                      - Wishlist page
//! POST /wishlist/toggle               - Optimistic toggle (returns button fragment)
//!
//! # Checkout
//! GET  /checkout                      - Shipping form and summary
//! POST /checkout                      - Place order
//! POST /checkout/coupon               - Apply coupon (returns summary fragment)
//! POST /checkout/coupon/remove        - Remove coupon
//!
//! # Orders (requires auth)
//! GET  /orders                        - Order history
//! GET  /orders/{id}                   - Detail and tracking
//! GET  /orders/{id}/confirmation      - Post-checkout confirmation
//! POST /orders/{id}/cancel            - Cancel
//! POST /orders/{id}/verify-payment    - Forward payment widget result
//!
//! # Auth (rate limited)
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/google                   - Google Identity Services callback
//! POST /auth/logout                   - Logout action
//!
//! # Account (requires auth)
//! GET  /account                       - Profile and recent orders
//! POST /account                       - Update profile
//!
//! # Notifications (requires auth)
//! GET  /notifications                 - List
//! POST /notifications/{id}/read       - Mark read
//! GET  /notifications/stream          - Live events (SSE)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::middleware::{AuthRejection, auth_rate_limiter};
use crate::state::AppState;

/// Whether the request came from HTMX.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Response for an auth failure surfaced mid-mutation.
pub(crate) fn sign_in_again(headers: &HeaderMap) -> Response {
    if is_htmx(headers) {
        AuthRejection::HtmxRedirect.into_response()
    } else {
        AuthRejection::RedirectToLogin.into_response()
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/google", post(auth::google))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the catalogue routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/results", get(products::results))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place_order))
        .route("/coupon", post(checkout::apply_coupon))
        .route("/coupon/remove", post(checkout::remove_coupon))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/confirmation", get(orders::confirmation))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/verify-payment", post(orders::verify_payment))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/stream", get(notifications::stream))
        .route("/{id}/read", post(notifications::mark_read))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/shop", shop_routes())
        .route("/products/{id}", get(products::show))
        .nest("/cart", cart_routes())
        .route("/wishlist", get(wishlist::index))
        .route("/wishlist/toggle", post(wishlist::toggle))
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .route("/account", get(account::index).post(account::update))
        .nest("/notifications", notification_routes())
        .nest("/auth", auth_routes())
}
