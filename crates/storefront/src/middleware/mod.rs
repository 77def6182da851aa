//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Session layer (tower-sessions, in-memory store)
//! 4. Request ID (recorded in span and Sentry scope)
//! 5. HTMX login redirect (login 303s become `HX-Redirect`)
//! 6. Rate limiting (governor, auth routes only)

pub mod auth;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAuth, SessionTokenStore, clear_current_user,
    htmx_login_redirect, set_current_user,
};
pub use flash::{push_flash, take_flashes};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, debounce_key};
