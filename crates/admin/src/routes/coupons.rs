//! Coupon management route handlers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use emporium_api::CouponInput;
use emporium_core::{Coupon, CouponId, DiscountType};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, instrument};

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAdmin, push_flash};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{SelectOption, datetime_local, format_datetime};

/// Coupon row for the listing.
#[derive(Debug, Clone)]
pub struct CouponView {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub min_order: String,
    pub window: String,
    pub usage: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl CouponView {
    fn new(coupon: &Coupon, now: DateTime<Utc>) -> Self {
        let (status, status_class) = if coupon.is_live_at(now) {
            ("Live", "bg-green-100 text-green-700")
        } else if coupon.is_active {
            ("Scheduled or spent", "bg-yellow-100 text-yellow-700")
        } else {
            ("Disabled", "bg-gray-100 text-gray-700")
        };
        Self {
            id: coupon.id,
            code: coupon.code.clone(),
            description: coupon.describe(),
            min_order: coupon.min_order_amount.to_string(),
            window: format!(
                "{} to {}",
                format_datetime(Some(coupon.valid_from)),
                format_datetime(Some(coupon.valid_until))
            ),
            usage: coupon.usage_limit.map_or_else(
                || format!("{} used", coupon.used_count),
                |limit| format!("{} / {limit}", coupon.used_count),
            ),
            status,
            status_class,
        }
    }
}

/// Create/edit form fields as typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CouponForm {
    pub code: String,
    pub discount_type: String,
    pub value: String,
    pub min_order_amount: String,
    pub valid_from: String,
    pub valid_until: String,
    pub usage_limit: String,
    pub is_active: Option<String>,
}

impl From<&Coupon> for CouponForm {
    fn from(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            discount_type: coupon.discount_type.as_str().to_string(),
            value: coupon.value.normalize().to_string(),
            min_order_amount: coupon.min_order_amount.amount().to_string(),
            valid_from: datetime_local(Some(coupon.valid_from)),
            valid_until: datetime_local(Some(coupon.valid_until)),
            usage_limit: coupon
                .usage_limit
                .map(|l| l.to_string())
                .unwrap_or_default(),
            is_active: coupon.is_active.then(|| "on".to_string()),
        }
    }
}

impl CouponForm {
    /// Validate and convert to the backend body. Codes are upper-cased.
    ///
    /// # Errors
    ///
    /// Returns a message suitable for a toast.
    pub fn to_input(&self) -> std::result::Result<CouponInput, String> {
        let code = self.code.trim().to_uppercase();
        if code.is_empty() {
            return Err("Code is required".to_string());
        }

        let discount_type = DiscountType::from_str(self.discount_type.trim())
            .map_err(|_| "Choose a discount type".to_string())?;

        let value = Decimal::from_str(self.value.trim())
            .map_err(|_| "Value must be a number".to_string())?;
        if value <= Decimal::ZERO {
            return Err("Value must be greater than zero".to_string());
        }
        if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
            return Err("A percentage discount cannot exceed 100".to_string());
        }

        let min_order_amount = match self.min_order_amount.trim() {
            "" => Decimal::ZERO,
            raw => Decimal::from_str(raw)
                .ok()
                .filter(|amount| *amount >= Decimal::ZERO)
                .ok_or("Minimum order must be a positive number")?,
        };

        let valid_from = parse_local(&self.valid_from).ok_or("Start date is required")?;
        let valid_until = parse_local(&self.valid_until).ok_or("End date is required")?;
        if valid_until <= valid_from {
            return Err("End date must be after the start date".to_string());
        }

        let usage_limit = match self.usage_limit.trim() {
            "" => None,
            raw => Some(
                raw.parse::<u32>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or("Usage limit must be a positive whole number")?,
            ),
        };

        Ok(CouponInput {
            code,
            discount_type,
            value,
            min_order_amount,
            valid_from,
            valid_until,
            usage_limit,
            is_active: self.is_active.is_some(),
        })
    }

    fn discount_types(&self) -> Vec<SelectOption> {
        [DiscountType::Percentage, DiscountType::Fixed]
            .into_iter()
            .map(|kind| SelectOption {
                value: kind.as_str().to_string(),
                label: match kind {
                    DiscountType::Percentage => "Percentage".to_string(),
                    DiscountType::Fixed => "Fixed amount".to_string(),
                },
                selected: self.discount_type == kind.as_str(),
            })
            .collect()
    }
}

/// `datetime-local` input value (browser local time treated as UTC).
pub(crate) fn parse_local(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|at| at.and_utc())
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsIndexTemplate {
    pub layout: Layout,
    pub coupons: Vec<CouponView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/form.html")]
pub struct CouponFormTemplate {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub discount_types: Vec<SelectOption>,
    pub form: CouponForm,
}

impl CouponFormTemplate {
    fn new(
        mut layout: Layout,
        heading: String,
        action: String,
        form: CouponForm,
        error: Option<String>,
    ) -> Self {
        if let Some(message) = error {
            layout.toasts.push(Flash::error(message));
        }
        Self {
            layout,
            heading,
            action,
            discount_types: form.discount_types(),
            form,
        }
    }
}

/// Coupons list.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
) -> Result<CouponsIndexTemplate> {
    let coupons = match state.api().session(&admin.tokens).admin_coupons().await {
        Ok(coupons) => coupons,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to fetch coupons");
            layout.toasts.push(Flash::error(e.user_message()));
            Vec::new()
        }
    };

    let now = Utc::now();
    Ok(CouponsIndexTemplate {
        layout,
        coupons: coupons.iter().map(|c| CouponView::new(c, now)).collect(),
    })
}

/// New coupon form, valid for 30 days from now.
#[instrument(skip_all)]
pub async fn new(layout: Layout) -> CouponFormTemplate {
    let now = Utc::now();
    let form = CouponForm {
        discount_type: DiscountType::Percentage.as_str().to_string(),
        valid_from: datetime_local(Some(now)),
        valid_until: datetime_local(Some(now + chrono::Duration::days(30))),
        is_active: Some("on".to_string()),
        ..CouponForm::default()
    };
    CouponFormTemplate::new(layout, "New coupon".to_string(), "/coupons".to_string(), form, None)
}

/// Create a coupon.
#[instrument(skip_all, fields(code = %form.code))]
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let heading = "New coupon".to_string();
    let action = "/coupons".to_string();
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            let page = CouponFormTemplate::new(layout, heading, action, form, Some(message));
            return Ok(page.into_response());
        }
    };

    match state
        .api()
        .session(&admin.tokens)
        .admin_create_coupon(&input)
        .await
    {
        Ok(coupon) => {
            push_flash(
                admin.tokens.session(),
                Flash::success(format!("Created {}", coupon.code)),
            )
            .await;
            Ok(Redirect::to("/coupons").into_response())
        }
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => {
            let message = Some(e.user_message());
            let page = CouponFormTemplate::new(layout, heading, action, form, message);
            Ok(page.into_response())
        }
    }
}

/// Edit coupon form.
#[instrument(skip(state, admin, layout))]
pub async fn edit(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<CouponId>,
) -> Result<CouponFormTemplate> {
    let coupon = state.api().session(&admin.tokens).admin_coupon(id).await?;
    Ok(CouponFormTemplate::new(
        layout,
        format!("Edit {}", coupon.code),
        format!("/coupons/{id}"),
        CouponForm::from(&coupon),
        None,
    ))
}

/// Update a coupon.
#[instrument(skip(state, admin, layout, form))]
pub async fn update(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<CouponId>,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let heading = format!("Edit {}", form.code.trim());
    let action = format!("/coupons/{id}");
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            let page = CouponFormTemplate::new(layout, heading, action, form, Some(message));
            return Ok(page.into_response());
        }
    };

    match state
        .api()
        .session(&admin.tokens)
        .admin_update_coupon(id, &input)
        .await
    {
        Ok(coupon) => {
            push_flash(
                admin.tokens.session(),
                Flash::success(format!("Saved {}", coupon.code)),
            )
            .await;
            Ok(Redirect::to("/coupons").into_response())
        }
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => {
            let message = Some(e.user_message());
            let page = CouponFormTemplate::new(layout, heading, action, form, message);
            Ok(page.into_response())
        }
    }
}

/// Delete a coupon.
#[instrument(skip(state, admin))]
pub async fn delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<CouponId>,
) -> Result<Redirect> {
    let flash = match state.api().session(&admin.tokens).admin_delete_coupon(id).await {
        Ok(()) => Flash::success("Coupon deleted"),
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(coupon_id = %id, error = %e, "failed to delete coupon");
            Flash::error(e.user_message())
        }
    };
    push_flash(admin.tokens.session(), flash).await;
    Ok(Redirect::to("/coupons"))
}
