//! Checkout, orders and coupons.

use emporium_core::{CouponQuote, Order, OrderId, Page, PaymentMethod, Price, ShippingInfo};
use serde::Serialize;
use tracing::{info, instrument};

use super::page_query;
use crate::auth::TokenStore;
use crate::client::{Authed, Call};
use crate::error::ApiError;

/// Order placement request. The backend prices it from the cart.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

impl<S: TokenStore> Authed<'_, S> {
    /// The signed-in user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn orders(&self, page: u32) -> Result<Page<Order>, ApiError> {
        self.fetch(Call::get("orders/").query(page_query(page)))
            .await
    }

    /// One order with items and tracking status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for another user's or unknown order.
    #[instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.fetch(Call::get(format!("orders/{id}/"))).await
    }

    /// Place an order from the current cart.
    ///
    /// For online payment the returned order carries the gateway payload in
    /// [`Order::payment`], untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for stock or coupon problems.
    #[instrument(skip(self, order), fields(payment = ?order.payment_method))]
    pub async fn place_order(&self, order: &NewOrder) -> Result<Order, ApiError> {
        let placed: Order = self.fetch(Call::post("orders/").json(order)?).await?;
        info!(order_id = %placed.id, total = %placed.total, "order placed");
        Ok(placed)
    }

    /// Cancel a pending or confirmed order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] if the order is past cancellation.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.fetch(Call::post(format!("orders/{id}/cancel/"))).await
    }

    /// Ask the backend to price a coupon against a subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with the backend's reason when the code is
    /// unknown, expired, exhausted, or below its minimum order amount.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str, subtotal: Price) -> Result<CouponQuote, ApiError> {
        let call = Call::post("orders/apply-coupon/").json(&serde_json::json!({
            "code": code.trim(),
            "subtotal": subtotal,
        }))?;
        self.fetch(call).await
    }

    /// Forward a payment gateway callback payload for verification.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the payment.
    #[instrument(skip(self, payload))]
    pub async fn verify_payment(
        &self,
        id: OrderId,
        payload: &serde_json::Value,
    ) -> Result<Order, ApiError> {
        self.fetch(Call::post(format!("orders/{id}/verify-payment/")).json(payload)?)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_body() {
        let order = NewOrder {
            shipping: ShippingInfo {
                full_name: "Asha".to_string(),
                ..ShippingInfo::default()
            },
            payment_method: PaymentMethod::CashOnDelivery,
            coupon_code: None,
        };
        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["shipping"]["full_name"], "Asha");
        assert!(body.get("coupon_code").is_none());
    }
}
