//! Account overview and profile editing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use emporium_api::ProfileUpdate;
use emporium_core::User;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;
use crate::views::{OrderRow, format_date};

/// Orders shown on the overview before linking to the full history.
const RECENT_ORDERS: usize = 5;

/// Profile fields for display and the edit form.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub member_since: String,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            name: user.display_name(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            member_since: format_date(user.date_joined),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub profile: ProfileView,
    pub orders: Vec<OrderRow>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        let phone = form.phone.trim();
        Self {
            first_name: Some(form.first_name.trim().to_string()),
            last_name: Some(form.last_name.trim().to_string()),
            phone: Some(phone.to_string()),
        }
    }
}

/// Account overview: profile plus recent orders.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
) -> Result<AccountTemplate> {
    let api = state.api().session(&auth.tokens);
    let (profile, orders) = tokio::join!(api.profile(), api.orders(1));
    let profile = profile?;

    let recent_orders = match orders {
        Ok(page) => page
            .results
            .iter()
            .take(RECENT_ORDERS)
            .map(OrderRow::from)
            .collect(),
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "failed to load recent orders");
            Vec::new()
        }
    };

    Ok(AccountTemplate {
        layout,
        profile: ProfileView::from(&profile),
        orders: recent_orders,
    })
}

/// Save profile edits and refresh the header name.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let session = auth.tokens.session();
    let update = ProfileUpdate::from(form);

    match state.api().session(&auth.tokens).update_profile(&update).await {
        Ok(user) => {
            session
                .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
                .await?;
            push_flash(session, Flash::success("Profile updated")).await;
        }
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            warn!(error = %e, "profile update rejected");
            push_flash(session, Flash::error(e.user_message())).await;
        }
    }
    Ok(Redirect::to("/account"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_form_trims_fields() {
        let update = ProfileUpdate::from(ProfileForm {
            first_name: " Asha ".to_string(),
            last_name: "Rao".to_string(),
            phone: "  ".to_string(),
        });
        assert_eq!(update.first_name.as_deref(), Some("Asha"));
        assert_eq!(update.phone.as_deref(), Some(""));
    }

    #[test]
    fn test_profile_view_defaults() {
        let user: User = serde_json::from_value(serde_json::json!({"id": 1, "email": "a@b.co"})).unwrap();
        let view = ProfileView::from(&user);
        assert_eq!(view.name, "a@b.co");
        assert_eq!(view.phone, "");
        assert_eq!(view.member_since, "-");
    }
}
