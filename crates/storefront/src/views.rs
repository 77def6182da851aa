//! Display models shared by several pages.
//!
//! Money and dates are formatted here so templates stay dumb.

use chrono::{DateTime, Utc};
use emporium_core::{Order, Product, ProductId, Wishlist};

/// Product tile on listing pages.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub price: String,
    pub original_price: Option<String>,
    pub discount_badge: Option<String>,
    pub image: Option<String>,
    pub in_stock: bool,
    pub wishlisted: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, wishlist: &Wishlist) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            brand: product.brand.as_ref().map(|b| b.name.clone()),
            price: product.effective_price().to_string(),
            original_price: product
                .is_discounted()
                .then(|| product.price.to_string()),
            discount_badge: product.discount_percent().map(|p| format!("-{p}%")),
            image: product.thumbnail().map(String::from),
            in_stock: product.in_stock(),
            wishlisted: wishlist.contains(product.id),
        }
    }
}

/// Row in an order list.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub placed: String,
    pub status: String,
    pub status_class: &'static str,
    pub items: u32,
    pub total: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed: format_date(order.created_at),
            status: order.status.label().to_string(),
            status_class: status_class(order),
            items: order.item_count(),
            total: order.total.to_string(),
        }
    }
}

/// Badge class for an order's status.
#[must_use]
pub const fn status_class(order: &Order) -> &'static str {
    use emporium_core::OrderStatus;

    match order.status {
        OrderStatus::Pending | OrderStatus::Confirmed => "badge badge-pending",
        OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::OutForDelivery => {
            "badge badge-active"
        }
        OrderStatus::Delivered => "badge badge-success",
        OrderStatus::Cancelled | OrderStatus::Returned => "badge badge-muted",
    }
}

/// `12 Mar 2026`, or a dash when the backend sent no timestamp.
#[must_use]
pub fn format_date(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |at| at.format("%-d %b %Y").to_string())
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use emporium_core::{Brand, BrandId, Price};

    use super::*;

    fn product(discount: Option<i64>) -> Product {
        Product {
            id: ProductId::new(5),
            name: "Trail Runner".to_string(),
            description: String::new(),
            price: Price::from_minor(2_000),
            discount_price: discount.map(Price::from_minor),
            stock: 3,
            category: "shoes".to_string(),
            brand: Some(Brand {
                id: BrandId::new(1),
                name: "Stride".to_string(),
                logo: None,
            }),
            images: vec!["/img/runner.jpg".to_string()],
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_card_shows_discount() {
        let mut wishlist = Wishlist::default();
        wishlist.toggle(ProductId::new(5));

        let card = ProductCard::new(&product(Some(1_500)), &wishlist);
        assert_eq!(card.price, Price::from_minor(1_500).to_string());
        assert_eq!(card.original_price, Some(Price::from_minor(2_000).to_string()));
        assert_eq!(card.discount_badge.as_deref(), Some("-25%"));
        assert!(card.wishlisted);

        let plain = ProductCard::new(&product(None), &Wishlist::default());
        assert!(plain.original_price.is_none());
        assert!(!plain.wishlisted);
    }

    #[test]
    fn test_pagination_links() {
        let pages = Pagination::new("/shop?search=shoe", 2, true, true, 5);
        assert_eq!(pages.prev_url.as_deref(), Some("/shop?search=shoe&page=1"));
        assert_eq!(pages.next_url.as_deref(), Some("/shop?search=shoe&page=3"));

        let first = Pagination::new("/orders", 1, false, false, 0);
        assert!(first.prev_url.is_none());
        assert_eq!(first.total_pages, 1);
    }

    #[test]
    fn test_format_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 12, 10, 0, 0).unwrap();
        assert_eq!(format_date(Some(at)), "12 Mar 2026");
        assert_eq!(format_date(None), "-");
    }
}
