//! Orders with their line items and shipping details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId};

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

impl ShippingInfo {
    /// Names of required fields that are blank, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("phone", &self.phone),
            ("address_line", &self.address_line),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// One-line address for lists.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.address_line.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A purchased line, snapshotted at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price paid.
    pub price: Price,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// An order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub shipping: ShippingInfo,
    #[serde(default)]
    pub subtotal: Price,
    #[serde(default)]
    pub discount: Price,
    pub total: Price,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Opaque payload from the payment gateway for online payments.
    #[serde(default)]
    pub payment: Option<serde_json::Value>,
}

impl Order {
    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the online payment still needs to be completed.
    #[must_use]
    pub fn awaits_online_payment(&self) -> bool {
        self.payment_method == PaymentMethod::Online
            && self.payment_status == PaymentStatus::Pending
            && self.status != OrderStatus::Cancelled
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let info = ShippingInfo {
            full_name: "Asha".to_string(),
            phone: " ".to_string(),
            city: "Pune".to_string(),
            ..ShippingInfo::default()
        };
        assert_eq!(
            info.missing_fields(),
            vec!["phone", "address_line", "state", "postal_code"]
        );
    }

    #[test]
    fn test_one_line_skips_blanks() {
        let info = ShippingInfo {
            address_line: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            ..ShippingInfo::default()
        };
        assert_eq!(info.one_line(), "12 MG Road, Pune, 411001");
    }

    #[test]
    fn test_order_payload() {
        let json = r#"{
            "id": 5, "status": "shipped", "payment_method": "online", "payment_status": "paid",
            "items": [{"id": 1, "product_id": 9, "product_name": "Runner", "quantity": 2, "price": "100.00"}],
            "shipping": {"full_name": "A", "phone": "1", "address_line": "x", "city": "y", "state": "z", "postal_code": "1"},
            "subtotal": "200.00", "discount": "20.00", "total": "180.00", "coupon_code": "SAVE10"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.items[0].line_total(), Price::from_minor(20_000));
        assert!(!order.awaits_online_payment());
    }
}
