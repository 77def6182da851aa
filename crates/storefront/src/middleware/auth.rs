//! Authentication extractors and the session-backed token store.
//!
//! Backend credentials are kept in the browser's server-side session. The
//! [`SessionTokenStore`] exposes them to [`emporium_api`], which refreshes
//! and clears them as needed.

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, StatusCode, header::LOCATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::{AuthTokens, TokenStore};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in customer.
///
/// If the customer is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth { user, tokens }: RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth {
    pub user: CurrentUser,
    pub tokens: SessionTokenStore,
}

/// Error returned when authentication is required but the customer is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for full page requests).
    RedirectToLogin,
    /// HTMX requests are told to navigate instead of swapping a redirect body.
    HtmxRedirect,
    /// No session layer installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::HtmxRedirect => (
                StatusCode::OK,
                [("HX-Redirect", HeaderValue::from_static("/auth/login"))],
            )
                .into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Whether the request came from HTMX.
#[must_use]
pub fn is_htmx(parts: &Parts) -> bool {
    parts.headers.contains_key("hx-request")
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

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                if is_htmx(parts) {
                    AuthRejection::HtmxRedirect
                } else {
                    AuthRejection::RedirectToLogin
                }
            })?;

        Ok(Self {
            user,
            tokens: SessionTokenStore::new(session),
        })
    }
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request if the customer is not logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
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

/// Helper to clear the current user and everything tied to them (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    for key in [
        session_keys::CURRENT_USER,
        session_keys::ACCESS_TOKEN,
        session_keys::REFRESH_TOKEN,
        session_keys::WISHLIST,
        session_keys::COUPON,
    ] {
        session.remove_value(key).await?;
    }
    Ok(())
}

// =============================================================================
// Token store
// =============================================================================

/// [`TokenStore`] over the browser session.
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

    async fn read(&self, key: &str) -> Option<String> {
        self.session.get::<String>(key).await.ok().flatten()
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
        AuthTokens::new(
            self.read(session_keys::ACCESS_TOKEN).await,
            self.read(session_keys::REFRESH_TOKEN).await,
        )
    }

    async fn save(&self, tokens: AuthTokens) {
        self.write(session_keys::ACCESS_TOKEN, tokens.access_value())
            .await;
        self.write(session_keys::REFRESH_TOKEN, tokens.refresh_value())
            .await;
    }

    async fn clear(&self) {
        if let Err(e) = clear_current_user(&self.session).await {
            tracing::error!(error = %e, "failed to clear session credentials");
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

/// `Location` of a redirect response, for tests.
#[cfg(test)]
pub(crate) fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(axum::http::header::LOCATION).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use emporium_core::UserId;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_token_store_roundtrip_and_clear() {
        let session = session();
        let store = SessionTokenStore::new(session.clone());

        session
            .insert(
                session_keys::CURRENT_USER,
                CurrentUser {
                    id: UserId::new(42),
                    email: "asha@example.com".to_string(),
                    name: "Asha".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .save(AuthTokens::new(Some("a1".to_string()), Some("r1".to_string())))
            .await;

        let tokens = store.load().await;
        assert_eq!(tokens.access_value().as_deref(), Some("a1"));
        assert_eq!(tokens.refresh_value().as_deref(), Some("r1"));
        assert_eq!(store.subject().await.as_deref(), Some("42"));

        store.clear().await;
        assert!(store.load().await.is_empty());
        assert!(store.subject().await.is_none());
    }

    #[test]
    fn test_rejections() {
        let response = AuthRejection::RedirectToLogin.into_response();
        assert_eq!(location(&response), Some("/auth/login"));

        let response = AuthRejection::HtmxRedirect.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["HX-Redirect"], "/auth/login");
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
