//! Order management route handlers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use emporium_core::{Order, OrderId, OrderStatus, Page};
use serde::Deserialize;
use tracing::{error, instrument};

use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAdmin, push_flash};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{
    OrderRowView, Pagination, SelectOption, format_datetime, page_number, status_class,
    status_options,
};

const PAGE_SIZE: u64 = 20;

/// Status filter and pagination.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub page: Option<String>,
}

impl OrdersQuery {
    /// Unknown or blank values mean "all".
    fn status(&self) -> Option<OrderStatus> {
        self.status
            .as_deref()
            .and_then(|s| OrderStatus::from_str(s.trim()).ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// One purchased line.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub total: String,
}

/// Full order for the detail page.
#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub id: String,
    pub placed: String,
    pub status: &'static str,
    pub status_class: &'static str,
    pub payment_method: &'static str,
    pub payment_status: &'static str,
    pub ship_to: String,
    pub phone: String,
    pub address: String,
    pub lines: Vec<OrderLineView>,
    pub subtotal: String,
    pub discount: Option<String>,
    pub coupon_code: Option<String>,
    pub total: String,
    /// Gateway payload as pretty JSON, for support lookups.
    pub payment_payload: Option<String>,
}

impl From<&Order> for OrderDetailView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed: format_datetime(order.created_at),
            status: order.status.label(),
            status_class: status_class(order.status),
            payment_method: order.payment_method.label(),
            payment_status: order.payment_status.label(),
            ship_to: order.shipping.full_name.clone(),
            phone: order.shipping.phone.clone(),
            address: order.shipping.one_line(),
            lines: order
                .items
                .iter()
                .map(|item| OrderLineView {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    price: item.price.to_string(),
                    total: item.line_total().to_string(),
                })
                .collect(),
            subtotal: order.subtotal.to_string(),
            discount: (!order.discount.is_zero()).then(|| order.discount.to_string()),
            coupon_code: order.coupon_code.clone(),
            total: order.total.to_string(),
            payment_payload: order
                .payment
                .as_ref()
                .and_then(|p| serde_json::to_string_pretty(p).ok()),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderRowView>,
    pub statuses: Vec<SelectOption>,
    pub pagination: Pagination,
}

#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderDetailView,
    pub statuses: Vec<SelectOption>,
}

/// Orders list, optionally filtered by status.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersIndexTemplate> {
    let status = query.status();
    let page_no = page_number(query.page.as_deref());

    let page = match state
        .api()
        .session(&admin.tokens)
        .admin_orders(status, page_no)
        .await
    {
        Ok(page) => page,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to fetch orders");
            layout.toasts.push(Flash::error(e.user_message()));
            Page::default()
        }
    };

    let base = status.map_or_else(
        || "/orders".to_string(),
        |s| format!("/orders?status={}", s.as_str()),
    );
    Ok(OrdersIndexTemplate {
        layout,
        orders: page.results.iter().map(OrderRowView::from).collect(),
        statuses: status_options(status),
        pagination: Pagination::new(
            &base,
            page_no,
            page.has_previous(),
            page.has_next(),
            page.total_pages(PAGE_SIZE),
        ),
    })
}

/// Order detail page.
#[instrument(skip(state, admin, layout))]
pub async fn show(
    State(state): State<AppState>,
    admin: RequireAdmin,
    layout: Layout,
    Path(id): Path<OrderId>,
) -> Result<OrderShowTemplate> {
    let order = state.api().session(&admin.tokens).admin_order(id).await?;
    Ok(OrderShowTemplate {
        layout,
        statuses: status_options(Some(order.status)),
        order: OrderDetailView::from(&order),
    })
}

/// Move an order to another status. The backend decides whether the
/// transition is allowed; a refusal comes back as a toast.
#[instrument(skip(state, admin))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let session = admin.tokens.session().clone();
    let flash = match OrderStatus::from_str(form.status.trim()) {
        Err(_) => Flash::error("Choose a valid status"),
        Ok(status) => match state
            .api()
            .session(&admin.tokens)
            .admin_update_order_status(id, status)
            .await
        {
            Ok(order) => Flash::success(format!(
                "Order #{} is now {}",
                order.id,
                order.status.label()
            )),
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                error!(order_id = %id, error = %e, "status update rejected");
                Flash::error(e.user_message())
            }
        },
    };

    push_flash(&session, flash).await;
    Ok(Redirect::to(&format!("/orders/{id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{
        OrderItem, OrderItemId, PaymentMethod, PaymentStatus, Price, ProductId, ShippingInfo,
    };

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(31),
            status: OrderStatus::Shipped,
            payment_method: PaymentMethod::Online,
            payment_status: PaymentStatus::Paid,
            items: vec![OrderItem {
                id: OrderItemId::new(1),
                product_id: ProductId::new(5),
                product_name: "Runner".to_string(),
                quantity: 2,
                price: Price::from_minor(1_000),
            }],
            shipping: ShippingInfo {
                full_name: "Asha Rao".to_string(),
                city: "Pune".to_string(),
                ..ShippingInfo::default()
            },
            subtotal: Price::from_minor(2_000),
            discount: Price::ZERO,
            total: Price::from_minor(2_000),
            coupon_code: None,
            created_at: None,
            payment: Some(serde_json::json!({"gateway_id": "pay_1"})),
        }
    }

    #[test]
    fn test_detail_view() {
        let view = OrderDetailView::from(&order());
        assert_eq!(view.lines[0].total, Price::from_minor(2_000).to_string());
        assert!(view.discount.is_none());
        assert_eq!(view.address, "Pune");
        assert!(view.payment_payload.unwrap().contains("pay_1"));
    }

    #[test]
    fn test_unknown_status_filter_means_all() {
        let query = OrdersQuery {
            status: Some("lost".to_string()),
            page: None,
        };
        assert!(query.status().is_none());

        let query = OrdersQuery {
            status: Some("out_for_delivery".to_string()),
            page: None,
        };
        assert_eq!(query.status(), Some(OrderStatus::OutForDelivery));
    }
}
