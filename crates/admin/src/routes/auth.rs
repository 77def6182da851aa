//! Authentication route handlers.
//!
//! Admins sign in with their backend credentials. The role comes from the
//! user the backend returns; a non-admin keeps their session and meets the
//! lockout middleware on the next page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    SessionTokenStore, clear_current_user, push_flash, set_current_user, take_flashes,
};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub toasts: Vec<Flash>,
}

/// Display login page. Signed-in admins go straight to the dashboard.
#[instrument(skip(session))]
pub async fn login_page(session: Session) -> Response {
    let signed_in_admin = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .is_some_and(|user| user.is_admin);
    if signed_in_admin {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        email: String::new(),
        toasts: take_flashes(&session).await,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim().to_string();
    let store = SessionTokenStore::new(session.clone());

    let user = match state.api().login(&store, &email, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "admin sign-in rejected");
            return Ok(LoginTemplate {
                email,
                toasts: vec![Flash::error(e.user_message())],
            }
            .into_response());
        }
    };

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&current.id, Some(&current.email));

    if current.is_admin {
        info!(user_id = %current.id, "admin signed in");
        push_flash(&session, Flash::success(format!("Welcome back, {}", current.name))).await;
    } else {
        warn!(user_id = %current.id, "non-admin signed in to the admin dashboard");
    }

    Ok(Redirect::to("/").into_response())
}

/// Handle logout. Works for anyone holding a session.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let store = SessionTokenStore::new(session.clone());
    state.api().session(&store).logout().await;
    clear_current_user(&session).await?;
    clear_sentry_user();

    push_flash(&session, Flash::success("Signed out")).await;
    Ok(Redirect::to("/auth/login"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_page_keeps_email_and_toast() {
        let html = LoginTemplate {
            email: "ops@example.com".to_string(),
            toasts: vec![Flash::error("Invalid credentials")],
        }
        .render()
        .unwrap();
        assert!(html.contains("value=\"ops@example.com\""));
        assert!(html.contains("Invalid credentials"));
    }
}
