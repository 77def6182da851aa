//! Order history, tracking, cancellation and online payment confirmation.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use emporium_core::{Order, OrderId, OrderStatus};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{is_htmx, sign_in_again};
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAuth, push_flash};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{OrderRow, Pagination, format_date, status_class};

const PAGE_SIZE: u64 = 10;

/// Lifecycle stages drawn on the tracking timeline.
const TIMELINE: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

#[derive(Debug, Clone)]
pub struct TimelineStep {
    pub label: &'static str,
    pub done: bool,
    pub current: bool,
}

/// Build the timeline. Cancelled and returned orders have none.
#[must_use]
pub fn timeline(status: OrderStatus) -> Vec<TimelineStep> {
    let Some(reached) = status.timeline_step() else {
        return Vec::new();
    };
    TIMELINE
        .iter()
        .enumerate()
        .map(|(i, step)| TimelineStep {
            label: step.label(),
            done: i <= reached,
            current: i == reached,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Full order for the detail and confirmation pages.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub id: OrderId,
    pub placed: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub payment_method: &'static str,
    pub payment_status: &'static str,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    pub total: String,
    pub ship_to: String,
    pub ship_phone: String,
    pub ship_address: String,
    pub cancellable: bool,
    pub awaits_payment: bool,
    /// Payment-provider payload, pretty printed for the confirmation page.
    pub payment_payload: Option<String>,
    pub timeline: Vec<TimelineStep>,
}

impl From<&Order> for OrderDetail {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            placed: format_date(order.created_at),
            status: order.status.label(),
            status_class: status_class(order),
            payment_method: order.payment_method.label(),
            payment_status: order.payment_status.label(),
            lines: order
                .items
                .iter()
                .map(|item| OrderLineView {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    price: item.price.to_string(),
                    line_total: item.line_total().to_string(),
                })
                .collect(),
            subtotal: order.subtotal.to_string(),
            discount: (!order.discount.is_zero()).then(|| format!("-{}", order.discount)),
            coupon_code: order.coupon_code.clone(),
            total: order.total.to_string(),
            ship_to: order.shipping.full_name.clone(),
            ship_phone: order.shipping.phone.clone(),
            ship_address: order.shipping.one_line(),
            cancellable: order.status.is_cancellable(),
            awaits_payment: order.awaits_online_payment(),
            payment_payload: order
                .payment
                .as_ref()
                .filter(|_| order.awaits_online_payment())
                .and_then(|payload| serde_json::to_string_pretty(payload).ok()),
            timeline: timeline(order.status),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderRow>,
    pub pagination: Pagination,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderDetail,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/confirmation.html")]
pub struct ConfirmationTemplate {
    pub layout: Layout,
    pub order: OrderDetail,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentForm {
    /// JSON returned by the payment widget.
    pub payload: String,
}

/// Order history.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersTemplate> {
    let page = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1);
    let orders = state.api().session(&auth.tokens).orders(page).await?;

    Ok(OrdersTemplate {
        layout,
        pagination: Pagination::new(
            "/orders",
            page,
            orders.has_previous(),
            orders.has_next(),
            orders.total_pages(PAGE_SIZE),
        ),
        orders: orders.results.iter().map(OrderRow::from).collect(),
    })
}

/// Order detail with tracking timeline.
#[instrument(skip_all, fields(order_id = id))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<OrderTemplate> {
    let order = load_order(&state, &auth, id).await?;
    Ok(OrderTemplate {
        layout,
        order: OrderDetail::from(&order),
    })
}

/// Page shown right after placing an order.
#[instrument(skip_all, fields(order_id = id))]
pub async fn confirmation(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
    Path(id): Path<i64>,
) -> Result<ConfirmationTemplate> {
    let order = load_order(&state, &auth, id).await?;
    Ok(ConfirmationTemplate {
        layout,
        order: OrderDetail::from(&order),
    })
}

async fn load_order(state: &AppState, auth: &RequireAuth, id: i64) -> Result<Order> {
    Ok(state.api().session(&auth.tokens).order(OrderId::new(id)).await?)
}

/// Cancel an order the backend still allows cancelling.
#[instrument(skip_all, fields(order_id = id))]
pub async fn cancel(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let session = auth.tokens.session();
    match state
        .api()
        .session(&auth.tokens)
        .cancel_order(OrderId::new(id))
        .await
    {
        Ok(order) => {
            info!(status = %order.status, "order cancelled");
            push_flash(session, Flash::success(format!("Order #{id} cancelled"))).await;
        }
        Err(e) if e.is_auth() => return sign_in_again(&headers),
        Err(e) => {
            warn!(error = %e, "cancel rejected");
            push_flash(session, Flash::error(e.user_message())).await;
        }
    }
    back_to_order(&headers, id)
}

/// Forward the payment widget's result to the backend for verification.
#[instrument(skip_all, fields(order_id = id))]
pub async fn verify_payment(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<VerifyPaymentForm>,
) -> Response {
    let session = auth.tokens.session();
    let payload = match serde_json::from_str::<serde_json::Value>(&form.payload) {
        Ok(payload) if payload.is_object() => payload,
        _ => {
            push_flash(session, Flash::error("Payment response was not understood")).await;
            return back_to_order(&headers, id);
        }
    };

    match state
        .api()
        .session(&auth.tokens)
        .verify_payment(OrderId::new(id), &payload)
        .await
    {
        Ok(order) => {
            info!(payment_status = order.payment_status.label(), "payment verified");
            push_flash(session, Flash::success("Payment received, thank you")).await;
        }
        Err(e) if e.is_auth() => return sign_in_again(&headers),
        Err(e) => {
            warn!(error = %e, "payment verification failed");
            push_flash(session, Flash::error(e.user_message())).await;
        }
    }
    back_to_order(&headers, id)
}

fn back_to_order(headers: &HeaderMap, id: i64) -> Response {
    let target = format!("/orders/{id}");
    if is_htmx(headers) {
        ([("HX-Redirect", target)]).into_response()
    } else {
        Redirect::to(&target).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(status: &str, payment_method: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": 42, "status": status, "payment_method": payment_method,
            "payment_status": "pending",
            "items": [{"id": 1, "product_id": 9, "product_name": "Runner", "quantity": 2, "price": "100.00"}],
            "shipping": {"full_name": "Asha", "phone": "99", "address_line": "12 MG Road",
                         "city": "Pune", "state": "MH", "postal_code": "411001"},
            "subtotal": "200.00", "discount": "0", "total": "200.00",
            "payment": {"gateway_order_id": "order_abc", "amount": 20000}
        }))
        .unwrap()
    }

    #[test]
    fn test_timeline_marks_progress() {
        let steps = timeline(OrderStatus::Shipped);
        assert_eq!(steps.len(), 6);
        assert!(steps[3].current);
        assert!(steps[..=3].iter().all(|s| s.done));
        assert!(!steps[4].done);
    }

    #[test]
    fn test_cancelled_orders_have_no_timeline() {
        assert!(timeline(OrderStatus::Cancelled).is_empty());
    }

    #[test]
    fn test_detail_exposes_payment_payload_only_while_pending() {
        let detail = OrderDetail::from(&order("pending", "online"));
        assert!(detail.awaits_payment);
        assert!(detail.payment_payload.unwrap().contains("order_abc"));
        assert!(detail.discount.is_none());
        assert!(detail.cancellable);

        let detail = OrderDetail::from(&order("pending", "cash_on_delivery"));
        assert!(detail.payment_payload.is_none());
    }
}
