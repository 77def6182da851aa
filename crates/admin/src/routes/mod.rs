//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Health check
//!
//! # Auth (backend credentials, role from the returned user)
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! POST /auth/logout               - Logout
//!
//! # Everything below runs behind the lockout middleware
//! GET  /                          - Dashboard stats
//!
//! # Products
//! GET  /products                  - Listing with search box
//! GET  /products/search           - Table fragment (HTMX, debounced)
//! GET  /products/new              - Create form
//! POST /products                  - Create
//! GET  /products/{id}/edit        - Edit form
//! POST /products/{id}             - Update
//! POST /products/{id}/delete      - Delete
//!
//! # Orders
//! GET  /orders                    - Listing with status filter
//! GET  /orders/{id}               - Detail
//! POST /orders/{id}/status        - Status update
//!
//! # Coupons / Banners (same shape)
//! GET  /coupons                   - Listing
//! GET  /coupons/new               - Create form
//! POST /coupons                   - Create
//! GET  /coupons/{id}/edit         - Edit form
//! POST /coupons/{id}              - Update
//! POST /coupons/{id}/delete       - Delete
//!
//! # Brands
//! GET  /brands                    - Listing with inline create form
//! POST /brands                    - Create
//! POST /brands/{id}/delete        - Delete
//!
//! # Users
//! GET  /users                     - Listing with search box
//! GET  /users/search              - Table fragment (HTMX, debounced)
//! POST /users/{id}/block          - Block or unblock
//! ```

pub mod auth;
pub mod banners;
pub mod brands;
pub mod coupons;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod users;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::HeaderMap,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::middleware::lockout_middleware;
use crate::models::Flash;
use crate::state::AppState;

/// Whether the request came from HTMX.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Out-of-band toasts appended to an HTMX response.
#[derive(Template, WebTemplate)]
#[template(path = "fragments/toasts.html")]
pub struct ToastsTemplate {
    pub toasts: Vec<Flash>,
}

/// Create all admin routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    let dashboard = Router::new()
        .route("/", get(dashboard::index))
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/coupons", coupon_routes())
        .nest("/banners", banner_routes())
        .nest("/brands", brand_routes())
        .nest("/users", user_routes())
        .route_layer(from_fn_with_state(state.clone(), lockout_middleware));

    Router::new()
        .nest("/auth", auth_routes())
        .merge(dashboard)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/search", get(products::search))
        .route("/new", get(products::new))
        .route("/{id}", post(products::update))
        .route("/{id}/edit", get(products::edit))
        .route("/{id}/delete", post(products::delete))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
}

fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/new", get(coupons::new))
        .route("/{id}", post(coupons::update))
        .route("/{id}/edit", get(coupons::edit))
        .route("/{id}/delete", post(coupons::delete))
}

fn banner_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(banners::index).post(banners::create))
        .route("/new", get(banners::new))
        .route("/{id}", post(banners::update))
        .route("/{id}/edit", get(banners::edit))
        .route("/{id}/delete", post(banners::delete))
}

fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(brands::index).post(brands::create))
        .route("/{id}/delete", post(brands::delete))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/search", get(users::search))
        .route("/{id}/block", post(users::set_blocked))
}
