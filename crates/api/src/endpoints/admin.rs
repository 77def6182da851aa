//! Admin-only endpoints. The backend enforces the role; these just shape the
//! requests.

use chrono::{DateTime, Utc};
use emporium_core::{
    BannerId, BannerOffer, Brand, BrandId, Coupon, CouponId, DiscountType, Order, OrderId,
    OrderStatus, Page, Price, Product, ProductId, User, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::page_query;
use crate::auth::TokenStore;
use crate::client::{Authed, Call};
use crate::error::ApiError;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_revenue: Price,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_products: u64,
    #[serde(default)]
    pub pending_orders: u64,
    #[serde(default)]
    pub recent_orders: Vec<Order>,
    #[serde(default)]
    pub low_stock: Vec<Product>,
}

/// Product create/update body.
#[derive(Debug, Clone, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub stock: i64,
    pub category: String,
    pub brand_id: Option<BrandId>,
    pub images: Vec<String>,
    pub is_active: bool,
}

/// Coupon create/update body.
#[derive(Debug, Clone, Serialize)]
pub struct CouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub is_active: bool,
}

/// Banner create/update body.
#[derive(Debug, Clone, Serialize)]
pub struct BannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Brand create body.
#[derive(Debug, Clone, Serialize)]
pub struct BrandInput {
    pub name: String,
    pub logo: Option<String>,
}

fn search_query(search: Option<&str>, page: u32) -> Vec<(String, String)> {
    let mut pairs = page_query(page);
    if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
        pairs.push(("search".to_string(), term.to_string()));
    }
    pairs
}

impl<S: TokenStore> Authed<'_, S> {
    /// Dashboard statistics.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] (403) for non-admins.
    #[instrument(skip(self))]
    pub async fn admin_dashboard(&self) -> Result<DashboardStats, ApiError> {
        self.fetch(Call::get("admin/dashboard/")).await
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Product list, including inactive products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_products(
        &self,
        search: Option<&str>,
        page: u32,
    ) -> Result<Page<Product>, ApiError> {
        self.fetch(Call::get("admin/products/").query(search_query(search, page)))
            .await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn admin_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.fetch(Call::get(format!("admin/products/{id}/"))).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn admin_create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let product: Product = self
            .fetch(Call::post("admin/products/").json(input)?)
            .await?;
        self.client().invalidate_catalog();
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors.
    #[instrument(skip(self, input))]
    pub async fn admin_update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let product = self
            .fetch(Call::patch(format!("admin/products/{id}/")).json(input)?)
            .await?;
        self.client().invalidate_catalog();
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        self.fetch_empty(Call::delete(format!("admin/products/{id}/")))
            .await?;
        self.client().invalidate_catalog();
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// All orders, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_orders(
        &self,
        status: Option<OrderStatus>,
        page: u32,
    ) -> Result<Page<Order>, ApiError> {
        let mut query = page_query(page);
        if let Some(status) = status {
            query.push(("status".to_string(), status.as_str().to_string()));
        }
        self.fetch(Call::get("admin/orders/").query(query)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn admin_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.fetch(Call::get(format!("admin/orders/{id}/"))).await
    }

    /// Move an order to a new status. The backend rejects illegal transitions.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for a rejected transition.
    #[instrument(skip(self))]
    pub async fn admin_update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let call = Call::patch(format!("admin/orders/{id}/"))
            .json(&serde_json::json!({ "status": status }))?;
        let order: Order = self.fetch(call).await?;
        info!(order_id = %id, status = %order.status, "order status updated");
        Ok(order)
    }

    // -------------------------------------------------------------------------
    // Coupons
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        self.fetch(Call::get("admin/coupons/")).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn admin_coupon(&self, id: CouponId) -> Result<Coupon, ApiError> {
        self.fetch(Call::get(format!("admin/coupons/{id}/"))).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors (e.g. duplicate code).
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn admin_create_coupon(&self, input: &CouponInput) -> Result<Coupon, ApiError> {
        self.fetch(Call::post("admin/coupons/").json(input)?).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors.
    #[instrument(skip(self, input))]
    pub async fn admin_update_coupon(
        &self,
        id: CouponId,
        input: &CouponInput,
    ) -> Result<Coupon, ApiError> {
        self.fetch(Call::patch(format!("admin/coupons/{id}/")).json(input)?)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_delete_coupon(&self, id: CouponId) -> Result<(), ApiError> {
        self.fetch_empty(Call::delete(format!("admin/coupons/{id}/")))
            .await
    }

    // -------------------------------------------------------------------------
    // Banners
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_banners(&self) -> Result<Vec<BannerOffer>, ApiError> {
        self.fetch(Call::get("admin/banners/")).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn admin_banner(&self, id: BannerId) -> Result<BannerOffer, ApiError> {
        self.fetch(Call::get(format!("admin/banners/{id}/"))).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn admin_create_banner(&self, input: &BannerInput) -> Result<BannerOffer, ApiError> {
        let banner = self
            .fetch(Call::post("admin/banners/").json(input)?)
            .await?;
        self.client().invalidate_catalog();
        Ok(banner)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors.
    #[instrument(skip(self, input))]
    pub async fn admin_update_banner(
        &self,
        id: BannerId,
        input: &BannerInput,
    ) -> Result<BannerOffer, ApiError> {
        let banner = self
            .fetch(Call::patch(format!("admin/banners/{id}/")).json(input)?)
            .await?;
        self.client().invalidate_catalog();
        Ok(banner)
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_delete_banner(&self, id: BannerId) -> Result<(), ApiError> {
        self.fetch_empty(Call::delete(format!("admin/banners/{id}/")))
            .await?;
        self.client().invalidate_catalog();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Brands
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_brands(&self) -> Result<Vec<Brand>, ApiError> {
        self.fetch(Call::get("admin/brands/")).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] for a duplicate name.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn admin_create_brand(&self, input: &BrandInput) -> Result<Brand, ApiError> {
        let brand = self.fetch(Call::post("admin/brands/").json(input)?).await?;
        self.client().invalidate_catalog();
        Ok(brand)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Status`] when products still reference the brand.
    #[instrument(skip(self))]
    pub async fn admin_delete_brand(&self, id: BrandId) -> Result<(), ApiError> {
        self.fetch_empty(Call::delete(format!("admin/brands/{id}/")))
            .await?;
        self.client().invalidate_catalog();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Customer list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_users(&self, search: Option<&str>, page: u32) -> Result<Page<User>, ApiError> {
        self.fetch(Call::get("admin/users/").query(search_query(search, page)))
            .await
    }

    /// Block or unblock a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn admin_set_user_blocked(&self, id: UserId, blocked: bool) -> Result<User, ApiError> {
        let call = Call::patch(format!("admin/users/{id}/block/"))
            .json(&serde_json::json!({ "is_blocked": blocked }))?;
        let user: User = self.fetch(call).await?;
        info!(user_id = %id, blocked, "user block state changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_trims_and_skips_blank() {
        assert!(search_query(Some("   "), 1).is_empty());
        assert_eq!(
            search_query(Some(" runner "), 3),
            vec![
                ("page".to_string(), "3".to_string()),
                ("search".to_string(), "runner".to_string()),
            ]
        );
    }

    #[test]
    fn test_dashboard_tolerates_missing_fields() {
        let stats: DashboardStats = serde_json::from_str(r#"{"total_orders": 12}"#).unwrap_or_default();
        assert_eq!(stats.total_orders, 12);
        assert!(stats.recent_orders.is_empty());
    }
}
