//! Authentication extractors for admin.
//!
//! Backend credentials live in the admin session. [`RequireAdmin`] hands the
//! route both the signed-in admin and a [`SessionTokenStore`] for API calls.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, StatusCode, header::LOCATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::{AuthTokens, TokenStore};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in admin.
///
/// Signed-out requests are sent to the login page. Signed-in non-admins get
/// 403 here; the lockout middleware normally answers them first.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin { user, .. }: RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAdmin {
    pub user: CurrentUser,
    pub tokens: SessionTokenStore,
}

/// Error returned when admin authentication is required.
#[derive(Debug)]
pub enum AdminAuthRejection {
    /// Redirect to login page (for full page requests).
    RedirectToLogin,
    /// HTMX requests navigate instead of swapping the redirect body.
    HtmxRedirect,
    /// Signed in without the admin role.
    Forbidden,
    /// No session layer installed.
    MissingSession,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::HtmxRedirect => (
                StatusCode::OK,
                [("HX-Redirect", HeaderValue::from_static("/auth/login"))],
            )
                .into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Turn a login redirect answering an HTMX request into `HX-Redirect`.
///
/// HTMX follows a 303 itself and swaps the login page into whatever target
/// the request named. Handlers that fail with an auth error only know how to
/// redirect, so the rewrite happens here for all of them.
pub async fn htmx_login_redirect(request: Request, next: Next) -> Response {
    let htmx = request.headers().contains_key("hx-request");
    let response = next.run(request).await;
    if !htmx || response.status() != StatusCode::SEE_OTHER {
        return response;
    }

    match response
        .headers()
        .get(LOCATION)
        .filter(|target| target.as_bytes().starts_with(b"/auth/login"))
    {
        Some(target) => (StatusCode::OK, [("HX-Redirect", target.clone())]).into_response(),
        None => response,
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::MissingSession)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                if parts.headers.contains_key("hx-request") {
                    AdminAuthRejection::HtmxRedirect
                } else {
                    AdminAuthRejection::RedirectToLogin
                }
            })?;

        if !user.is_admin {
            return Err(AdminAuthRejection::Forbidden);
        }

        Ok(Self {
            user,
            tokens: SessionTokenStore::new(session),
        })
    }
}

/// Store the signed-in user under a fresh session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the signed-in user and their credentials. The lockout counter stays.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    for key in [
        session_keys::CURRENT_USER,
        session_keys::ACCESS_TOKEN,
        session_keys::REFRESH_TOKEN,
    ] {
        session.remove_value(key).await?;
    }
    Ok(())
}

/// [`TokenStore`] over the admin session.
#[derive(Clone)]
pub struct SessionTokenStore {
    session: Session,
}

impl SessionTokenStore {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    async fn write(&self, key: &str, value: Option<String>) {
        let result = match value {
            Some(value) => self.session.insert(key, value).await,
            None => self.session.remove_value(key).await.map(drop),
        };
        if let Err(e) = result {
            tracing::error!(error = %e, key, "failed to write token to session");
        }
    }
}

impl TokenStore for SessionTokenStore {
    async fn load(&self) -> AuthTokens {
        let access = self
            .session
            .get::<String>(session_keys::ACCESS_TOKEN)
            .await
            .ok()
            .flatten();
        let refresh = self
            .session
            .get::<String>(session_keys::REFRESH_TOKEN)
            .await
            .ok()
            .flatten();
        AuthTokens::new(access, refresh)
    }

    async fn save(&self, tokens: AuthTokens) {
        self.write(session_keys::ACCESS_TOKEN, tokens.access_value())
            .await;
        self.write(session_keys::REFRESH_TOKEN, tokens.refresh_value())
            .await;
    }

    async fn clear(&self) {
        if let Err(e) = clear_current_user(&self.session).await {
            tracing::error!(error = %e, "failed to clear admin credentials");
        }
    }

    async fn subject(&self) -> Option<String> {
        self.session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .map(|user| user.id.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use emporium_core::UserId;
    use tower_sessions::MemoryStore;

    use super::*;

    fn user(is_admin: bool) -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            email: "ops@example.com".to_string(),
            name: "Ops".to_string(),
            is_admin,
        }
    }

    async fn extract(session: Option<Session>, htmx: bool) -> Result<RequireAdmin, AdminAuthRejection> {
        let mut builder = Request::builder().uri("/products");
        if htmx {
            builder = builder.header("hx-request", "true");
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        RequireAdmin::from_request_parts(&mut parts, &()).await
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_admin_passes() {
        let session = session();
        session
            .insert(session_keys::CURRENT_USER, user(true))
            .await
            .unwrap();
        let admin = extract(Some(session), false).await.unwrap();
        assert_eq!(admin.user.id, UserId::new(7));
        assert_eq!(admin.tokens.subject().await.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_rejections() {
        assert!(matches!(
            extract(Some(session()), false).await,
            Err(AdminAuthRejection::RedirectToLogin)
        ));
        assert!(matches!(
            extract(Some(session()), true).await,
            Err(AdminAuthRejection::HtmxRedirect)
        ));
        assert!(matches!(
            extract(None, false).await,
            Err(AdminAuthRejection::MissingSession)
        ));

        let session = session();
        session
            .insert(session_keys::CURRENT_USER, user(false))
            .await
            .unwrap();
        assert!(matches!(
            extract(Some(session), false).await,
            Err(AdminAuthRejection::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_clear_keeps_lockout_counter() {
        let session = session();
        let store = SessionTokenStore::new(session.clone());
        session
            .insert(session_keys::LOCKOUT_ATTEMPTS, 2_u32)
            .await
            .unwrap();
        store
            .save(AuthTokens::new(Some("a".to_string()), Some("r".to_string())))
            .await;

        store.clear().await;
        assert!(store.load().await.is_empty());
        assert_eq!(
            session
                .get::<u32>(session_keys::LOCKOUT_ATTEMPTS)
                .await
                .unwrap(),
            Some(2)
        );
    }

    async fn through_htmx_layer(target: &'static str, htmx: bool) -> Response {
        use axum::{Router, body::Body, routing::get};
        use tower::ServiceExt;

        let app = Router::new()
            .route("/", get(move || async move { Redirect::to(target) }))
            .layer(axum::middleware::from_fn(htmx_login_redirect));
        let mut builder = axum::http::Request::builder().uri("/");
        if htmx {
            builder = builder.header("hx-request", "true");
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_redirects_become_hx_redirect_for_htmx() {
        let response = through_htmx_layer("/auth/login", true).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["HX-Redirect"], "/auth/login");
        assert!(response.headers().get(LOCATION).is_none());

        let response = through_htmx_layer("/auth/login", false).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/auth/login");

        // Other redirects are left for HTMX to follow.
        let response = through_htmx_layer("/cart", true).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get("HX-Redirect").is_none());
    }
}
