//! Catalogue entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BrandId, Price, ProductId};

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

/// A product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub discount_price: Option<Price>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: Option<Brand>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// Price the customer pays per unit.
    ///
    /// A discount price only applies when it is positive and below the list price.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        match self.discount_price {
            Some(discount) if !discount.is_zero() && discount < self.price => discount,
            _ => self.price,
        }
    }

    /// Whether a valid discount is being shown.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.effective_price() < self.price
    }

    /// Whole percentage off the list price, if discounted.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        use rust_decimal::prelude::ToPrimitive;

        if !self.is_discounted() || self.price.is_zero() {
            return None;
        }
        let off = (self.price.amount() - self.effective_price().amount()) / self.price.amount();
        (off * rust_decimal::Decimal::ONE_HUNDRED).round().to_u32()
    }

    /// Whether the backend reports stock on hand.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// First image, used as the card thumbnail.
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: i64, price_minor: i64, discount_minor: Option<i64>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Price::from_minor(price_minor),
            discount_price: discount_minor.map(Price::from_minor),
            stock: 5,
            category: "shoes".to_string(),
            brand: None,
            images: Vec::new(),
            is_active: true,
            created_at: None,
        }
    }

    #[test]
    fn test_effective_price_uses_lower_discount() {
        let p = product(1, 10_000, Some(7_500));
        assert_eq!(p.effective_price(), Price::from_minor(7_500));
        assert_eq!(p.discount_percent(), Some(25));
    }

    #[test]
    fn test_effective_price_ignores_bogus_discount() {
        assert_eq!(
            product(1, 10_000, Some(12_000)).effective_price(),
            Price::from_minor(10_000)
        );
        assert_eq!(
            product(1, 10_000, Some(0)).effective_price(),
            Price::from_minor(10_000)
        );
        assert_eq!(product(1, 10_000, None).discount_percent(), None);
    }

    #[test]
    fn test_product_payload_with_nested_brand() {
        let json = r#"{
            "id": 9, "name": "Runner", "price": "2499.00", "discount_price": null,
            "stock": 0, "category": "shoes",
            "brand": {"id": 2, "name": "Stride"},
            "images": ["https://cdn/x.jpg"]
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.brand.as_ref().unwrap().name, "Stride");
        assert!(!p.in_stock());
        assert!(p.is_active);
    }
}
