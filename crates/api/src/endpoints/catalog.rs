//! Public catalogue reads: products, brands, banners. Cached.

use emporium_core::{BannerOffer, Brand, BrandId, Page, Product, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::{CacheKey, CacheValue};
use crate::client::{ApiClient, Call};
use crate::error::ApiError;

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    #[default]
    Newest,
    PriceLowHigh,
    PriceHighLow,
    Name,
}

impl Ordering {
    /// Every ordering, for the sort dropdown.
    pub const ALL: [Self; 4] = [Self::Newest, Self::PriceLowHigh, Self::PriceHighLow, Self::Name];

    /// Backend `ordering` parameter.
    #[must_use]
    pub const fn as_query(&self) -> &'static str {
        match self {
            Self::Newest => "-created_at",
            Self::PriceLowHigh => "price",
            Self::PriceHighLow => "-price",
            Self::Name => "name",
        }
    }

    /// Form value, matching the serde name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceLowHigh => "price_low_high",
            Self::PriceHighLow => "price_high_low",
            Self::Name => "name",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceLowHigh => "Price: low to high",
            Self::PriceHighLow => "Price: high to low",
            Self::Name => "Name",
        }
    }
}

/// Shop listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub brand: Option<BrandId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub ordering: Ordering,
    #[serde(default)]
    pub page: Option<u32>,
}

impl ProductFilter {
    /// Query pairs for `products/`. Blank strings and default values are omitted.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: String| pairs.push((key.to_string(), value));

        if let Some(search) = non_blank(self.search.as_deref()) {
            push("search", search.to_string());
        }
        if let Some(brand) = self.brand {
            push("brand", brand.to_string());
        }
        if let Some(category) = non_blank(self.category.as_deref()) {
            push("category", category.to_string());
        }

        // Swapped bounds are a user typo, not an empty result.
        let (min, max) = match (self.min_price, self.max_price) {
            (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
            bounds => bounds,
        };
        if let Some(min) = min.filter(|v| !v.is_sign_negative()) {
            push("min_price", min.normalize().to_string());
        }
        if let Some(max) = max.filter(|v| !v.is_sign_negative()) {
            push("max_price", max.normalize().to_string());
        }

        push("ordering", self.ordering.as_query().to_string());
        if let Some(page) = self.page.filter(|p| *p > 1) {
            push("page", page.to_string());
        }
        pairs
    }

    /// Current page, 1-based.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn cache_key(&self) -> String {
        self.to_query()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl ApiClient {
    /// Filtered, paginated product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn products(&self, filter: &ProductFilter) -> Result<Page<Product>, ApiError> {
        let key = CacheKey::Products(filter.cache_key());
        if let Some(CacheValue::Products(page)) = self.cache().get(&key).await {
            debug!("cache hit for product listing");
            return Ok(page);
        }

        let page: Page<Product> = self
            .fetch_public(Call::get("products/").query(filter.to_query()))
            .await?;

        self.cache()
            .insert(key, CacheValue::Products(page.clone()))
            .await;
        Ok(page)
    }

    /// Product detail.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cache().get(&key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.fetch_public(Call::get(format!("products/{id}/"))).await?;

        self.cache()
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// All brands.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        if let Some(CacheValue::Brands(brands)) = self.cache().get(&CacheKey::Brands).await {
            return Ok(brands);
        }

        let brands: Vec<Brand> = self.fetch_public(Call::get("products/brands/")).await?;
        self.cache()
            .insert(CacheKey::Brands, CacheValue::Brands(brands.clone()))
            .await;
        Ok(brands)
    }

    /// Banner offers currently active on the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend request fails.
    #[instrument(skip(self))]
    pub async fn banners(&self) -> Result<Vec<BannerOffer>, ApiError> {
        if let Some(CacheValue::Banners(banners)) = self.cache().get(&CacheKey::Banners).await {
            return Ok(banners);
        }

        let banners: Vec<BannerOffer> = self.fetch_public(Call::get("products/banners/")).await?;
        self.cache()
            .insert(CacheKey::Banners, CacheValue::Banners(banners.clone()))
            .await;
        Ok(banners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_only_orders() {
        let pairs = ProductFilter::default().to_query();
        assert_eq!(
            pairs,
            vec![("ordering".to_string(), "-created_at".to_string())]
        );
    }

    #[test]
    fn test_filter_skips_blanks_and_swaps_bounds() {
        let filter = ProductFilter {
            search: Some("  ".to_string()),
            brand: Some(BrandId::new(4)),
            category: Some("shoes".to_string()),
            min_price: Some(Decimal::new(5000, 2)),
            max_price: Some(Decimal::new(1000, 2)),
            ordering: Ordering::PriceLowHigh,
            page: Some(2),
        };
        let pairs = filter.to_query();
        let get = |k: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("search"), None);
        assert_eq!(get("brand"), Some("4"));
        assert_eq!(get("min_price"), Some("10"));
        assert_eq!(get("max_price"), Some("50"));
        assert_eq!(get("ordering"), Some("price"));
        assert_eq!(get("page"), Some("2"));
    }

    #[test]
    fn test_same_filters_share_cache_key() {
        let a = ProductFilter {
            search: Some("shoe".to_string()),
            ..ProductFilter::default()
        };
        let b = ProductFilter {
            search: Some(" shoe ".to_string()),
            page: Some(1),
            ..ProductFilter::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
