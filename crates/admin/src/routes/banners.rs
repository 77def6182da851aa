//! Banner offer management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use emporium_api::BannerInput;
use emporium_core::{BannerId, BannerOffer};
use serde::Deserialize;
use tracing::{error, instrument};

use super::coupons::parse_local;
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAdmin, push_flash};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{datetime_local, format_datetime};

/// Banner row for the listing.
#[derive(Debug, Clone)]
pub struct BannerView {
    pub id: BannerId,
    pub title: String,
    pub subtitle: String,
    pub image: Option<String>,
    pub link: Option<String>,
    pub window: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl BannerView {
    fn new(banner: &BannerOffer, now: DateTime<Utc>) -> Self {
        let (status, status_class) = if banner.is_showing_at(now) {
            ("Showing", "bg-green-100 text-green-700")
        } else if banner.is_active {
            ("Scheduled", "bg-yellow-100 text-yellow-700")
        } else {
            ("Hidden", "bg-gray-100 text-gray-700")
        };
        let window = match (banner.starts_at, banner.ends_at) {
            (None, None) => "Always".to_string(),
            (start, end) => format!("{} to {}", format_datetime(start), format_datetime(end)),
        };
        Self {
            id: banner.id,
            title: banner.title.clone(),
            subtitle: banner.subtitle.clone().unwrap_or_default(),
            image: banner.image.clone(),
            link: banner.link.clone(),
            window,
            status,
            status_class,
        }
    }
}

/// Create/edit form fields as typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BannerForm {
    pub title: String,
    pub subtitle: String,
    pub image: String,
    pub link: String,
    pub starts_at: String,
    pub ends_at: String,
    pub is_active: Option<String>,
}

impl From<&BannerOffer> for BannerForm {
    fn from(banner: &BannerOffer) -> Self {
        Self {
            title: banner.title.clone(),
            subtitle: banner.subtitle.clone().unwrap_or_default(),
            image: banner.image.clone().unwrap_or_default(),
            link: banner.link.clone().unwrap_or_default(),
            starts_at: datetime_local(banner.starts_at),
            ends_at: datetime_local(banner.ends_at),
            is_active: banner.is_active.then(|| "on".to_string()),
        }
    }
}

fn optional(raw: &str) -> Option<String> {
    Some(raw.trim()).filter(|s| !s.is_empty()).map(String::from)
}

impl BannerForm {
    /// Validate and convert to the backend body. Blank dates leave that end
    /// of the window open.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a toast.
    pub fn to_input(&self) -> std::result::Result<BannerInput, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required".to_string());
        }

        let starts_at = match self.starts_at.trim() {
            "" => None,
            raw => Some(parse_local(raw).ok_or("Start date is invalid")?),
        };
        let ends_at = match self.ends_at.trim() {
            "" => None,
            raw => Some(parse_local(raw).ok_or("End date is invalid")?),
        };
        if let (Some(start), Some(end)) = (starts_at, ends_at)
            && end <= start
        {
            return Err("End date must be after the start date".to_string());
        }

        Ok(BannerInput {
            title: title.to_string(),
            subtitle: optional(&self.subtitle),
            image: optional(&self.image),
            link: optional(&self.link),
            is_active: self.is_active.is_some(),
            starts_at,
            ends_at,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "banners/index.html")]
pub struct BannersIndexTemplate {
    pub layout: Layout,
    pub banners: Vec<BannerView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "banners/form.html")]
pub struct BannerFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub form: BannerForm,
}

impl BannerFormTemplate {
    fn new(
        mut layout: Layout,
        heading: String,
        action: String,
        form: BannerForm,
        error: Option<String>,
    ) -> Self {
        if let Some(message) = error {
            layout.toasts.push(Flash::error(message));
        }
        Self {
            layout,
            heading,
            action,
            form,
        }
    }
}

/// Banners list.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
) -> Result<BannersIndexTemplate> {
    let banners = match state.api().session(&admin.tokens).admin_banners().await {
        Ok(banners) => banners,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to fetch banners");
            layout.toasts.push(Flash::error(e.user_message()));
            Vec::new()
        }
    };

    let now = Utc::now();
    Ok(BannersIndexTemplate {
        layout,
        banners: banners.iter().map(|b| BannerView::new(b, now)).collect(),
    })
}

/// New banner form.
#[instrument(skip_all)]
pub async fn new(layout: Layout) -> BannerFormTemplate {
    let form = BannerForm {
        is_active: Some("on".to_string()),
        ..BannerForm::default()
    };
    BannerFormTemplate::new(layout, "New banner".to_string(), "/banners".to_string(), form, None)
}

/// Create a banner.
#[instrument(skip_all, fields(title = %form.title))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Form(form): Form<BannerForm>,
) -> Result<Response> {
    let heading = "New banner".to_string();
    let action = "/banners".to_string();
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            let page = BannerFormTemplate::new(layout, heading, action, form, Some(message));
            return Ok(page.into_response());
        }
    };

    match state
        .api()
        .session(&admin.tokens)
        .admin_create_banner(&input)
        .await
    {
        Ok(banner) => {
            push_flash(
                admin.tokens.session(),
                Flash::success(format!("Created {}", banner.title)),
            )
            .await;
            Ok(Redirect::to("/banners").into_response())
        }
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => {
            let message = Some(e.user_message());
            let page = BannerFormTemplate::new(layout, heading, action, form, message);
            Ok(page.into_response())
        }
    }
}

/// Edit banner form.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<BannerId>,
) -> Result<BannerFormTemplate> {
    let banner = state.api().session(&admin.tokens).admin_banner(id).await?;
    Ok(BannerFormTemplate::new(
        layout,
        format!("Edit {}", banner.title),
        format!("/banners/{id}"),
        BannerForm::from(&banner),
        None,
    ))
}

/// Update a banner.
#[instrument(skip(state, admin, layout, form))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<BannerId>,
    Form(form): Form<BannerForm>,
) -> Result<Response> {
    let heading = format!("Edit {}", form.title.trim());
    let action = format!("/banners/{id}");
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            let page = BannerFormTemplate::new(layout, heading, action, form, Some(message));
            return Ok(page.into_response());
        }
    };

    match state
        .api()
        .session(&admin.tokens)
        .admin_update_banner(id, &input)
        .await
    {
        Ok(banner) => {
            push_flash(
                admin.tokens.session(),
                Flash::success(format!("Saved {}", banner.title)),
            )
            .await;
            Ok(Redirect::to("/banners").into_response())
        }
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => {
            let message = Some(e.user_message());
            let page = BannerFormTemplate::new(layout, heading, action, form, message);
            Ok(page.into_response())
        }
    }
}

/// Delete a banner.
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<BannerId>,
) -> Result<Redirect> {
    let flash = match state.api().session(&admin.tokens).admin_delete_banner(id).await {
        Ok(()) => Flash::success("Banner deleted"),
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(banner_id = %id, error = %e, "failed to delete banner");
            Flash::error(e.user_message())
        }
    };
    push_flash(admin.tokens.session(), flash).await;
    Ok(Redirect::to("/banners"))
}
