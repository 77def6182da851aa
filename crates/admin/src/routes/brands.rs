//! Brand management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use emporium_api::BrandInput;
use emporium_core::{Brand, BrandId};
use serde::Deserialize;
use tracing::{error, instrument};

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAdmin, push_flash};
use crate::models::Flash;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BrandForm {
    pub name: String,
    pub logo: String,
}

impl BrandForm {
    fn to_input(&self) -> Option<BrandInput> {
        let name = self.name.trim();
        (!name.is_empty()).then(|| BrandInput {
            name: name.to_string(),
            logo: Some(self.logo.trim())
                .filter(|s| !s.is_empty())
                .map(String::from),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "brands/index.html")]
pub struct BrandsIndexTemplate {
    pub layout: Layout,
    pub brands: Vec<Brand>,
}

/// Brands list with the create form.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
) -> Result<BrandsIndexTemplate> {
    let brands = match state.api().session(&admin.tokens).admin_brands().await {
        Ok(brands) => brands,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to fetch brands");
            layout.toasts.push(Flash::error(e.user_message()));
            Vec::new()
        }
    };
    Ok(BrandsIndexTemplate { layout, brands })
}

/// Create a brand.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Form(form): Form<BrandForm>,
) -> Result<Redirect> {
    let flash = match form.to_input() {
        None => Flash::error("Brand name is required"),
        Some(input) => match state.api().session(&admin.tokens).admin_create_brand(&input).await {
            Ok(brand) => Flash::success(format!("Added {}", brand.name)),
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => Flash::error(e.user_message()),
        },
    };
    push_flash(admin.tokens.session(), flash).await;
    Ok(Redirect::to("/brands"))
}

/// Delete a brand. The backend refuses while products still use it.
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<BrandId>,
) -> Result<Redirect> {
    let flash = match state.api().session(&admin.tokens).admin_delete_brand(id).await {
        Ok(()) => Flash::success("Brand deleted"),
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(brand_id = %id, error = %e, "failed to delete brand");
            Flash::error(e.user_message())
        }
    };
    push_flash(admin.tokens.session(), flash).await;
    Ok(Redirect::to("/brands"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected_and_logo_optional() {
        assert!(BrandForm::default().to_input().is_none());

        let input = BrandForm {
            name: " Stride ".to_string(),
            logo: String::new(),
        }
        .to_input();
        assert!(input.is_some_and(|i| i.name == "Stride" && i.logo.is_none()));
    }
}
