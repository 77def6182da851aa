//! Checkout: shipping form, coupon, order placement.
//!
//! The backend validates coupons and prices orders. The applied quote is
//! kept in the session together with the subtotal it was quoted against, and
//! re-quoted if the cart has changed since.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::{ApiError, NewOrder};
use emporium_core::{Cart, CouponQuote, PaymentMethod, Price, ShippingInfo};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use super::cart::CartView;
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{AuthRejection, RequireAuth, SessionTokenStore, push_flash, take_flashes};
use crate::models::{Flash, session_keys};
use crate::state::AppState;

/// Coupon quote plus the subtotal it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub quote: CouponQuote,
    pub subtotal: Price,
}

/// Price summary shown beside the shipping form.
#[derive(Debug, Clone)]
pub struct Summary {
    pub subtotal: String,
    pub coupon_code: Option<String>,
    pub discount: Option<String>,
    pub total: String,
}

impl Summary {
    fn new(cart: &Cart, coupon: Option<&AppliedCoupon>) -> Self {
        let subtotal = cart.subtotal();
        match coupon {
            Some(applied) => Self {
                subtotal: subtotal.to_string(),
                coupon_code: Some(applied.quote.code.clone()),
                discount: Some(format!("-{}", applied.quote.discount)),
                total: applied.quote.total.to_string(),
            },
            None => Self {
                subtotal: subtotal.to_string(),
                coupon_code: None,
                discount: None,
                total: subtotal.to_string(),
            },
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub summary: Summary,
    pub shipping: ShippingInfo,
    pub online_selected: bool,
}

/// Summary fragment returned by coupon actions (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/checkout_summary.html")]
pub struct SummaryTemplate {
    pub summary: Summary,
    pub toasts: Vec<Flash>,
}

#[derive(Debug, Deserialize)]
pub struct CouponForm {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address_line: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl PlaceOrderForm {
    fn shipping(&self) -> ShippingInfo {
        ShippingInfo {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address_line: self.address_line.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn applied_coupon(session: &Session) -> Option<AppliedCoupon> {
    session
        .get::<AppliedCoupon>(session_keys::COUPON)
        .await
        .ok()
        .flatten()
}

async fn store_coupon(session: &Session, coupon: Option<&AppliedCoupon>) {
    let result = match coupon {
        Some(coupon) => session.insert(session_keys::COUPON, coupon).await,
        None => session.remove_value(session_keys::COUPON).await.map(drop),
    };
    if let Err(e) = result {
        warn!(error = %e, "failed to store coupon");
    }
}

/// The applied coupon, re-quoted if the cart subtotal moved. A coupon that no
/// longer applies is dropped with a toast.
async fn current_coupon(
    state: &AppState,
    tokens: &SessionTokenStore,
    cart: &Cart,
) -> std::result::Result<Option<AppliedCoupon>, ApiError> {
    let session = tokens.session();
    let Some(applied) = applied_coupon(session).await else {
        return Ok(None);
    };

    let subtotal = cart.subtotal();
    if applied.subtotal == subtotal {
        return Ok(Some(applied));
    }

    match state
        .api()
        .session(tokens)
        .apply_coupon(&applied.quote.code, subtotal)
        .await
    {
        Ok(quote) => {
            let requoted = AppliedCoupon { quote, subtotal };
            store_coupon(session, Some(&requoted)).await;
            Ok(Some(requoted))
        }
        Err(e) if e.is_auth() => Err(e),
        Err(e) => {
            store_coupon(session, None).await;
            push_flash(
                session,
                Flash::error(format!("Coupon {} removed: {}", applied.quote.code, e.user_message())),
            )
            .await;
            Ok(None)
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Checkout page. An empty cart goes back to the cart page.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn show(State(state): State<AppState>, auth: RequireAuth, layout: Layout) -> Result<Response> {
    let cart = state.api().session(&auth.tokens).cart().await?;
    if cart.is_empty() {
        push_flash(auth.tokens.session(), Flash::error("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    render_checkout(&state, &auth.tokens, layout, cart, ShippingInfo::default(), false).await
}

async fn render_checkout(
    state: &AppState,
    tokens: &SessionTokenStore,
    mut layout: Layout,
    cart: Cart,
    shipping: ShippingInfo,
    online_selected: bool,
) -> Result<Response> {
    let coupon = current_coupon(state, tokens, &cart).await?;
    // Toasts raised while re-quoting belong on this page.
    layout.toasts.extend(take_flashes(tokens.session()).await);

    Ok(CheckoutTemplate {
        layout,
        summary: Summary::new(&cart, coupon.as_ref()),
        cart: CartView::from(&cart),
        shipping,
        online_selected,
    }
    .into_response())
}

/// Apply a coupon code. Invalid codes leave no discount and raise an error toast.
#[instrument(skip_all, fields(code = %form.code.trim()))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let session = auth.tokens.session();
    let api = state.api().session(&auth.tokens);
    let cart = api.cart().await?;
    let code = form.code.trim();

    let applied = if code.is_empty() {
        push_flash(session, Flash::error("Enter a coupon code")).await;
        None
    } else {
        match api.apply_coupon(code, cart.subtotal()).await {
            Ok(quote) => {
                info!(discount = %quote.discount, "coupon applied");
                push_flash(session, Flash::success(format!("Coupon {} applied", quote.code))).await;
                Some(AppliedCoupon {
                    quote,
                    subtotal: cart.subtotal(),
                })
            }
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "coupon rejected");
                push_flash(session, Flash::error(e.user_message())).await;
                None
            }
        }
    };
    store_coupon(session, applied.as_ref()).await;

    Ok(summary_response(&headers, session, &cart, applied.as_ref()).await)
}

/// Remove the applied coupon.
#[instrument(skip_all)]
pub async fn remove_coupon(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
) -> Result<Response> {
    let session = auth.tokens.session();
    store_coupon(session, None).await;
    push_flash(session, Flash::success("Coupon removed")).await;

    let cart = state.api().session(&auth.tokens).cart().await?;
    Ok(summary_response(&headers, session, &cart, None).await)
}

async fn summary_response(
    headers: &HeaderMap,
    session: &Session,
    cart: &Cart,
    coupon: Option<&AppliedCoupon>,
) -> Response {
    if !headers.contains_key("hx-request") {
        return Redirect::to("/checkout").into_response();
    }
    SummaryTemplate {
        summary: Summary::new(cart, coupon),
        toasts: take_flashes(session).await,
    }
    .into_response()
}

/// Place the order. Validation failures re-render the form with the entered values.
#[instrument(skip_all, fields(user_id = %auth.user.id, payment = ?form.payment_method))]
pub async fn place_order(
    State(state): State<AppState>,
    auth: RequireAuth,
    mut layout: Layout,
    Form(form): Form<PlaceOrderForm>,
) -> Result<Response> {
    let session = auth.tokens.session();
    let api = state.api().session(&auth.tokens);
    let cart = api.cart().await?;
    let online = form.payment_method == PaymentMethod::Online;
    let shipping = form.shipping();

    if cart.is_empty() {
        push_flash(session, Flash::error("Your cart is empty")).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let missing = shipping.missing_fields();
    if !missing.is_empty() {
        layout.toasts.push(Flash::error(format!(
            "Please fill in: {}",
            missing
                .iter()
                .map(|field| field.replace('_', " "))
                .collect::<Vec<_>>()
                .join(", ")
        )));
        return render_checkout(&state, &auth.tokens, layout, cart, shipping, online).await;
    }

    let coupon = current_coupon(&state, &auth.tokens, &cart).await?;
    let order = NewOrder {
        shipping: shipping.clone(),
        payment_method: form.payment_method,
        coupon_code: coupon.map(|c| c.quote.code),
    };

    match api.place_order(&order).await {
        Ok(placed) => {
            store_coupon(session, None).await;
            push_flash(session, Flash::success(format!("Order #{} placed", placed.id))).await;
            Ok(Redirect::to(&format!("/orders/{}/confirmation", placed.id)).into_response())
        }
        Err(e) if e.is_auth() => Ok(AuthRejection::RedirectToLogin.into_response()),
        Err(e) => {
            warn!(error = %e, "order placement failed");
            layout.toasts.push(Flash::error(e.user_message()));
            render_checkout(&state, &auth.tokens, layout, cart, shipping, online).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{CartItem, CartItemId};

    use super::*;

    fn cart(total_minor: i64) -> Cart {
        let product = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Lamp", "price": "10.00", "stock": 1
        }))
        .unwrap();
        Cart {
            items: vec![CartItem {
                id: CartItemId::new(1),
                product,
                quantity: 1,
                subtotal: None,
            }],
            total: Some(Price::from_minor(total_minor)),
        }
    }

    #[test]
    fn test_summary_without_coupon_charges_subtotal() {
        let summary = Summary::new(&cart(50_000), None);
        assert_eq!(summary.total, summary.subtotal);
        assert!(summary.discount.is_none());
    }

    #[test]
    fn test_summary_with_coupon_uses_backend_total() {
        let applied = AppliedCoupon {
            quote: CouponQuote {
                code: "SAVE10".to_string(),
                discount: Price::from_minor(5_000),
                total: Price::from_minor(45_000),
            },
            subtotal: Price::from_minor(50_000),
        };
        let summary = Summary::new(&cart(50_000), Some(&applied));
        assert_eq!(summary.coupon_code.as_deref(), Some("SAVE10"));
        assert_eq!(summary.total, Price::from_minor(45_000).to_string());
        assert_eq!(summary.discount, Some(format!("-{}", Price::from_minor(5_000))));
    }

    #[test]
    fn test_place_order_form_trims_and_defaults() {
        let form: PlaceOrderForm = serde_json::from_value(serde_json::json!({
            "full_name": " Asha ", "phone": "99", "address_line": "12 MG Road",
            "city": "Pune", "state": "MH", "postal_code": "411001",
            "payment_method": "online"
        }))
        .unwrap();
        assert_eq!(form.payment_method, PaymentMethod::Online);
        let shipping = form.shipping();
        assert_eq!(shipping.full_name, "Asha");
        assert!(shipping.missing_fields().is_empty());

        let form: PlaceOrderForm = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(form.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(form.shipping().missing_fields().len(), 6);
    }
}
