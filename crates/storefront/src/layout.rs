//! Per-request data every page layout needs.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::middleware::take_flashes;
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Header/footer context for full pages. Extracting it consumes pending toasts.
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub toasts: Vec<Flash>,
    pub google_client_id: Option<String>,
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let (user, toasts) = match parts.extensions.get::<Session>() {
            Some(session) => (
                session
                    .get::<CurrentUser>(session_keys::CURRENT_USER)
                    .await
                    .ok()
                    .flatten(),
                take_flashes(session).await,
            ),
            None => (None, Vec::new()),
        };

        Ok(Self {
            user,
            toasts,
            google_client_id: state.config().google_client_id.clone(),
        })
    }
}
