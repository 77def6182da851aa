//! Attempt counter for signed-in non-admins.
//!
//! Every dashboard route sits behind [`lockout_middleware`]. Admins pass
//! straight through. A signed-in non-admin gets a 403 page and a strike in
//! their session; the third strike asks the backend to block the account and
//! signs them out. The backend still enforces the admin role on every call.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{error, info, warn};

use super::{SessionTokenStore, clear_current_user, push_flash};
use crate::error::clear_sentry_user;
use crate::filters;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Strikes before the account is blocked.
pub const MAX_ATTEMPTS: u32 = 3;

/// Shown to non-admins below the limit.
#[derive(Template, WebTemplate)]
#[template(path = "errors/forbidden.html")]
pub struct ForbiddenTemplate {
    pub remaining: u32,
}

/// Gate the dashboard on the admin role, counting non-admin visits.
pub async fn lockout_middleware(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let htmx = request.headers().contains_key("hx-request");

    let user = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();

    let Some(user) = user else {
        return to_login(htmx);
    };

    if user.is_admin {
        return next.run(request).await;
    }

    let attempts = record_attempt(&session).await;
    warn!(
        user_id = %user.id,
        attempts,
        path = %request.uri().path(),
        "non-admin opened the admin dashboard"
    );

    if attempts >= MAX_ATTEMPTS {
        lock_out(&state, &session, &user).await;
        return to_login(htmx);
    }

    (
        StatusCode::FORBIDDEN,
        ForbiddenTemplate {
            remaining: MAX_ATTEMPTS - attempts,
        },
    )
        .into_response()
}

/// Add a strike and return the new total.
async fn record_attempt(session: &Session) -> u32 {
    let attempts = session
        .get::<u32>(session_keys::LOCKOUT_ATTEMPTS)
        .await
        .ok()
        .flatten()
        .unwrap_or(0)
        .saturating_add(1);

    if let Err(e) = session.insert(session_keys::LOCKOUT_ATTEMPTS, attempts).await {
        error!(error = %e, "failed to store lockout counter");
    }
    attempts
}

/// Block the account server-side, then sign out locally.
///
/// Signing out happens even if the block call fails.
async fn lock_out(state: &AppState, session: &Session, user: &CurrentUser) {
    let tokens = SessionTokenStore::new(session.clone());
    let api = state.api().session(&tokens);

    match api.block_self().await {
        Ok(()) => info!(user_id = %user.id, "account blocked after repeated admin attempts"),
        Err(e) => error!(user_id = %user.id, error = %e, "failed to block account"),
    }
    api.logout().await;

    if let Err(e) = clear_current_user(session).await {
        error!(error = %e, "failed to clear session after lockout");
    }
    if let Err(e) = session.remove_value(session_keys::LOCKOUT_ATTEMPTS).await {
        error!(error = %e, "failed to reset lockout counter");
    }
    clear_sentry_user();

    push_flash(
        session,
        Flash::error("Your account has been blocked after repeated attempts to open the admin dashboard"),
    )
    .await;
}

fn to_login(htmx: bool) -> Response {
    if htmx {
        (
            StatusCode::OK,
            [("HX-Redirect", HeaderValue::from_static("/auth/login"))],
        )
            .into_response()
    } else {
        Redirect::to("/auth/login").into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_attempts_accumulate() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert_eq!(record_attempt(&session).await, 1);
        assert_eq!(record_attempt(&session).await, 2);
        assert_eq!(record_attempt(&session).await, 3);
    }

    #[test]
    fn test_forbidden_page_counts_down() {
        let html = ForbiddenTemplate { remaining: 2 }.render().unwrap();
        assert!(html.contains("2 more"));
    }

    #[test]
    fn test_htmx_gets_hx_redirect() {
        let response = to_login(true);
        assert_eq!(response.headers()["HX-Redirect"], "/auth/login");
        assert_eq!(to_login(false).status(), StatusCode::SEE_OTHER);
    }
}
