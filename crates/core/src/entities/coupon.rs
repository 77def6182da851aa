//! Coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CouponId, DiscountType, Price};

/// A discount code managed from the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage points for `Percentage`, an amount for `Fixed`.
    pub value: Decimal,
    #[serde(default)]
    pub min_order_amount: Price,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default)]
    pub is_active: bool,
}

impl Coupon {
    /// Whether the coupon would be shown as live at `now`.
    ///
    /// Badge only. Redemption is validated by the backend.
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.valid_from <= now
            && now <= self.valid_until
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Human description of the discount, e.g. `10% off` or `₹150.00 off`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => format!("{}% off", self.value.normalize()),
            DiscountType::Fixed => format!("{} off", Price::new(self.value)),
        }
    }
}

/// Result of `orders/apply-coupon/`: the discount the backend granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponQuote {
    pub code: String,
    pub discount: Price,
    pub total: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: CouponId::new(1),
            code: "SAVE10".to_string(),
            discount_type: DiscountType::Percentage,
            value: Decimal::new(10, 0),
            min_order_amount: Price::ZERO,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            usage_limit: Some(5),
            used_count: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_live_within_window() {
        assert!(coupon().is_live_at(Utc::now()));
    }

    #[test]
    fn test_not_live_when_exhausted_or_expired() {
        let mut c = coupon();
        c.used_count = 5;
        assert!(!c.is_live_at(Utc::now()));

        let c = coupon();
        assert!(!c.is_live_at(Utc::now() + Duration::days(2)));
    }

    #[test]
    fn test_describe() {
        let mut c = coupon();
        assert_eq!(c.describe(), "10% off");
        c.discount_type = DiscountType::Fixed;
        c.value = Decimal::new(15_000, 2);
        assert_eq!(c.describe(), "₹150.00 off");
    }
}
