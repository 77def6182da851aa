//! Sign-in, registration, Google sign-in and sign-out.
//!
//! The backend issues the credentials; this module only moves them into the
//! session via [`SessionTokenStore`] and records who is signed in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, header::COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::Registration;
use emporium_core::{Email, User};
use serde::Deserialize;
use tower_sessions::{Session, cookie::Cookie};
use tracing::{info, instrument, warn};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{SessionTokenStore, clear_current_user, push_flash, set_current_user};
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LEN: usize = 8;

/// Cookie set by Google Identity Services for its double-submit check.
const GOOGLE_CSRF_COOKIE: &str = "g_csrf_token";

// =============================================================================
// Form Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

/// Google Identity Services redirect-mode post.
#[derive(Debug, Deserialize)]
pub struct GoogleForm {
    pub credential: String,
    #[serde(default)]
    pub g_csrf_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub next: String,
    pub login_uri: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
}

/// Only same-site paths are followed after sign-in.
fn safe_next(next: Option<&str>) -> &str {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

async fn remember_user(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(&user.email));
    Ok(())
}

// =============================================================================
// Login
// =============================================================================

/// Login page.
pub async fn login_page(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<NextQuery>,
) -> Response {
    if layout.user.is_some() {
        return Redirect::to(safe_next(query.next.as_deref())).into_response();
    }
    LoginTemplate {
        layout,
        email: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        login_uri: format!("{}/auth/google", state.config().base_url.trim_end_matches('/')),
    }
    .into_response()
}

/// Email and password sign-in.
#[instrument(skip_all, fields(email = %form.email.trim()))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let store = SessionTokenStore::new(session.clone());
    let email = form.email.trim();

    match state.api().login(&store, email, &form.password).await {
        Ok(user) => {
            remember_user(&session, &user).await?;
            push_flash(&session, Flash::success(format!("Welcome back, {}", user.display_name()))).await;
            Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
        }
        Err(e) => {
            warn!(error = %e, "sign-in rejected");
            layout.toasts.push(Flash::error(e.user_message()));
            Ok(LoginTemplate {
                layout,
                email: email.to_string(),
                next: safe_next(form.next.as_deref()).to_string(),
                login_uri: format!("{}/auth/google", state.config().base_url.trim_end_matches('/')),
            }
            .into_response())
        }
    }
}

/// Google sign-in callback.
///
/// Google posts the ID token together with a CSRF token that must match the
/// `g_csrf_token` cookie it set on our origin.
#[instrument(skip_all)]
pub async fn google(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<GoogleForm>,
) -> Result<Response> {
    if state.config().google_client_id.is_none() {
        push_flash(&session, Flash::error("Google sign-in is not available")).await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    if !google_csrf_matches(&headers, &form.g_csrf_token) {
        warn!("google sign-in csrf mismatch");
        push_flash(&session, Flash::error("Google sign-in failed, please try again")).await;
        return Ok(Redirect::to("/auth/login").into_response());
    }

    let store = SessionTokenStore::new(session.clone());
    match state.api().google_login(&store, &form.credential).await {
        Ok(user) => {
            remember_user(&session, &user).await?;
            push_flash(&session, Flash::success(format!("Welcome, {}", user.display_name()))).await;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            warn!(error = %e, "google sign-in rejected");
            push_flash(&session, Flash::error(e.user_message())).await;
            Ok(Redirect::to("/auth/login").into_response())
        }
    }
}

fn google_csrf_matches(headers: &HeaderMap, submitted: &str) -> bool {
    if submitted.is_empty() {
        return false;
    }
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(std::result::Result::ok)
        .any(|cookie| cookie.name() == GOOGLE_CSRF_COOKIE && cookie.value() == submitted)
}

// =============================================================================
// Registration
// =============================================================================

/// Registration page.
pub async fn register_page(layout: Layout) -> Response {
    if layout.user.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        layout,
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        phone: String::new(),
    }
    .into_response()
}

/// Create an account, then send the visitor to sign in.
#[instrument(skip_all, fields(email = %form.email.trim()))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    mut layout: Layout,
    Form(form): Form<RegisterForm>,
) -> Response {
    let outcome = match validate_registration(&form) {
        Err(message) => Err(message),
        Ok(email) => {
            let phone = form.phone.trim();
            let registration = Registration {
                email: email.into_inner(),
                password: form.password.clone(),
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                phone: (!phone.is_empty()).then(|| phone.to_string()),
            };
            state
                .api()
                .register(&registration)
                .await
                .map_err(|e| e.user_message())
        }
    };

    match outcome {
        Ok(user) => {
            info!(user_id = %user.id, "account created");
            push_flash(&session, Flash::success("Account created, please sign in")).await;
            Redirect::to("/auth/login").into_response()
        }
        Err(message) => {
            layout.toasts.push(Flash::error(message));
            RegisterTemplate {
                layout,
                email: form.email,
                first_name: form.first_name,
                last_name: form.last_name,
                phone: form.phone,
            }
            .into_response()
        }
    }
}

fn validate_registration(form: &RegisterForm) -> std::result::Result<Email, String> {
    let email = Email::parse(&form.email).map_err(|e| format!("Invalid email: {e}"))?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
    if form.password != form.password_confirm {
        return Err("Passwords do not match".to_string());
    }
    Ok(email)
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out. The backend drops its refresh cookie; the session forgets the user.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let store = SessionTokenStore::new(session.clone());
    state.api().session(&store).logout().await;
    clear_current_user(&session).await?;
    clear_sentry_user();

    push_flash(&session, Flash::success("Signed out")).await;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next(Some("/orders/5")), "/orders/5");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_google_csrf_double_submit() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("emporium_session=abc; g_csrf_token=tok123"),
        );
        assert!(google_csrf_matches(&headers, "tok123"));
        assert!(!google_csrf_matches(&headers, "other"));
        assert!(!google_csrf_matches(&headers, ""));
        assert!(!google_csrf_matches(&HeaderMap::new(), "tok123"));
    }

    #[test]
    fn test_registration_checks_email_and_passwords() {
        let form = |email: &str, password: &str, confirm: &str| RegisterForm {
            email: email.to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
        };

        let ok = validate_registration(&form(" Asha@Example.com ", "long enough", "long enough"));
        assert_eq!(ok.map(Email::into_inner).as_deref(), Ok("asha@example.com"));

        assert!(validate_registration(&form("no-at-sign", "long enough", "long enough")).is_err());
        assert!(validate_registration(&form("a@b.co", "short", "short")).is_err());
        assert_eq!(
            validate_registration(&form("a@b.co", "long enough", "different!")).err().as_deref(),
            Some("Passwords do not match")
        );
    }
}
