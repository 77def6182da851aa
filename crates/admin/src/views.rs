//! Display models shared across admin pages.

use chrono::{DateTime, Utc};
use emporium_core::{Order, OrderStatus, Product};

use crate::models::CurrentUser;

/// Admin user view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
    pub initials: String,
}

impl From<&CurrentUser> for AdminUserView {
    fn from(user: &CurrentUser) -> Self {
        let initials = user
            .name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            initials,
        }
    }
}

/// Product row for listings.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: String,
    pub discount_price: Option<String>,
    pub stock: i64,
    pub stock_class: &'static str,
    pub status: &'static str,
    pub status_class: &'static str,
    pub image_url: Option<String>,
}

/// Stock at or below this is flagged.
pub const LOW_STOCK: i64 = 5;

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let (status, status_class) = if product.is_active {
            ("Active", "bg-green-100 text-green-700")
        } else {
            ("Hidden", "bg-gray-100 text-gray-700")
        };
        let stock_class = match product.stock {
            s if s <= 0 => "text-red-600",
            s if s <= LOW_STOCK => "text-yellow-600",
            _ => "text-gray-900",
        };

        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            brand: product
                .brand
                .as_ref()
                .map_or_else(|| "-".to_string(), |b| b.name.clone()),
            category: product.category.clone(),
            price: product.price.to_string(),
            discount_price: product
                .is_discounted()
                .then(|| product.effective_price().to_string()),
            stock: product.stock,
            stock_class,
            status,
            status_class,
            image_url: product.thumbnail().map(String::from),
        }
    }
}

/// Order row for listings.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: String,
    pub placed: String,
    pub customer: String,
    pub items: u32,
    pub total: String,
    pub payment: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl From<&Order> for OrderRowView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed: format_datetime(order.created_at),
            customer: order.shipping.full_name.clone(),
            items: order.item_count(),
            total: order.total.to_string(),
            payment: format!(
                "{} / {}",
                order.payment_method.label(),
                order.payment_status.label()
            ),
            status: order.status.label(),
            status_class: status_class(order.status),
        }
    }
}

/// Badge colours per order status.
#[must_use]
pub const fn status_class(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "bg-yellow-100 text-yellow-700",
        OrderStatus::Confirmed | OrderStatus::Processing => "bg-blue-100 text-blue-700",
        OrderStatus::Shipped | OrderStatus::OutForDelivery => "bg-indigo-100 text-indigo-700",
        OrderStatus::Delivered => "bg-green-100 text-green-700",
        OrderStatus::Cancelled | OrderStatus::Returned => "bg-gray-100 text-gray-700",
    }
}

/// Option in a `<select>`.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Order status choices, marking `current`.
#[must_use]
pub fn status_options(current: Option<OrderStatus>) -> Vec<SelectOption> {
    OrderStatus::ALL
        .iter()
        .map(|status| SelectOption {
            value: status.as_str().to_string(),
            label: status.label().to_string(),
            selected: current == Some(*status),
        })
        .collect()
}

/// `12 Mar 2026, 14:05`, or a dash.
#[must_use]
pub fn format_datetime(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |at| at.format("%-d %b %Y, %H:%M").to_string(),
    )
}

/// Value for `<input type="datetime-local">`.
#[must_use]
pub fn datetime_local(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}

/// Previous/next links for paginated lists.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pagination {
    /// `base_url` must already contain a `?` if it carries other parameters.
    #[must_use]
    pub fn new(base_url: &str, page: u32, has_previous: bool, has_next: bool, total_pages: u64) -> Self {
        let sep = if base_url.contains('?') { '&' } else { '?' };
        let link = |p: u32| format!("{base_url}{sep}page={p}");
        Self {
            page,
            total_pages: total_pages.max(1),
            prev_url: (has_previous && page > 1).then(|| link(page - 1)),
            next_url: has_next.then(|| link(page + 1)),
        }
    }
}

/// Parse a `page` query value, defaulting to 1.
#[must_use]
pub fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use emporium_core::{Price, ProductId, UserId};

    use super::*;

    #[test]
    fn test_initials() {
        let view = AdminUserView::from(&CurrentUser {
            id: UserId::new(1),
            email: "asha@example.com".to_string(),
            name: "asha rao kumar".to_string(),
            is_admin: true,
        });
        assert_eq!(view.initials, "AR");
    }

    #[test]
    fn test_product_row_flags_stock() {
        let product = Product {
            id: ProductId::new(3),
            name: "Runner".to_string(),
            description: String::new(),
            price: Price::from_minor(2_000),
            discount_price: Some(Price::from_minor(1_500)),
            stock: 2,
            category: "shoes".to_string(),
            brand: None,
            images: Vec::new(),
            is_active: false,
            created_at: None,
        };
        let view = ProductView::from(&product);
        assert_eq!(view.stock_class, "text-yellow-600");
        assert_eq!(view.status, "Hidden");
        assert_eq!(view.brand, "-");
        assert_eq!(view.discount_price, Some(Price::from_minor(1_500).to_string()));
    }

    #[test]
    fn test_status_options_mark_current() {
        let options = status_options(Some(OrderStatus::Shipped));
        assert_eq!(options.len(), OrderStatus::ALL.len());
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert!(options.iter().any(|o| o.selected && o.value == "shipped"));
        assert!(status_options(None).iter().all(|o| !o.selected));
    }

    #[test]
    fn test_datetime_formats() {
        let at = Utc.with_ymd_and_hms(2026, 3, 12, 14, 5, 0).unwrap();
        assert_eq!(format_datetime(Some(at)), "12 Mar 2026, 14:05");
        assert_eq!(datetime_local(Some(at)), "2026-03-12T14:05");
        assert_eq!(datetime_local(None), "");
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number(Some("3")), 3);
        assert_eq!(page_number(Some("0")), 1);
        assert_eq!(page_number(Some("x")), 1);
        assert_eq!(page_number(None), 1);
    }
}
