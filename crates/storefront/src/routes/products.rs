//! Shop listing and product detail.
//!
//! The listing page renders once with the filter form; the form then asks
//! `/shop/results` for fresh results on every keystroke. Those requests are
//! debounced per browser so a burst of typing reaches the backend once.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use emporium_api::{Ordering, ProductFilter};
use emporium_core::{Page, Product, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use super::wishlist::local_wishlist;
use crate::error::{AppError, Result};
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{OptionalAuth, debounce_key};
use crate::state::AppState;
use crate::views::{Pagination, ProductCard};

/// Backend page size for product listings.
const PAGE_SIZE: u64 = 12;

/// Raw shop query. Every field is a string because empty form inputs arrive
/// as `brand=&min_price=`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShopQuery {
    pub search: String,
    pub brand: String,
    pub category: String,
    pub min_price: String,
    pub max_price: String,
    pub ordering: String,
    pub page: String,
}

impl ShopQuery {
    /// Typed filter. Unparseable values are ignored rather than rejected.
    #[must_use]
    pub fn to_filter(&self) -> ProductFilter {
        let text = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        let money = |s: &str| s.trim().parse::<Decimal>().ok();

        ProductFilter {
            search: text(&self.search),
            brand: self.brand.trim().parse().ok(),
            category: text(&self.category),
            min_price: money(&self.min_price),
            max_price: money(&self.max_price),
            ordering: Ordering::ALL
                .into_iter()
                .find(|o| o.as_str() == self.ordering)
                .unwrap_or_default(),
            page: self.page.trim().parse().ok(),
        }
    }

    /// `/shop?...` for pagination links, without the page number.
    #[must_use]
    pub fn base_url(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("search", &self.search),
            ("brand", &self.brand),
            ("category", &self.category),
            ("min_price", &self.min_price),
            ("max_price", &self.max_price),
            ("ordering", &self.ordering),
        ] {
            if !value.trim().is_empty() {
                query.append_pair(key, value.trim());
            }
        }
        let query = query.finish();
        if query.is_empty() {
            "/shop".to_string()
        } else {
            format!("/shop?{query}")
        }
    }
}

/// A `<select>` option.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Result grid plus pagination.
pub struct ShopResults {
    pub products: Vec<ProductCard>,
    pub count: u64,
    pub pagination: Pagination,
}

impl ShopResults {
    fn new(page: &Page<Product>, query: &ShopQuery, current: u32, wishlist: &emporium_core::Wishlist) -> Self {
        Self {
            products: page
                .results
                .iter()
                .map(|p| ProductCard::new(p, wishlist))
                .collect(),
            count: page.count,
            pagination: Pagination::new(
                &query.base_url(),
                current,
                page.has_previous(),
                page.has_next(),
                page.total_pages(PAGE_SIZE),
            ),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/index.html")]
pub struct ShopTemplate {
    pub layout: Layout,
    pub query: ShopQuery,
    pub brands: Vec<SelectOption>,
    pub orderings: Vec<SelectOption>,
    pub results: ShopResults,
}

#[derive(Template, WebTemplate)]
#[template(path = "shop/results.html")]
pub struct ShopResultsTemplate {
    pub results: ShopResults,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductTemplate {
    pub layout: Layout,
    pub product: Product,
    pub card: ProductCard,
    pub product_id: ProductId,
    pub wishlisted: bool,
}

/// Full shop page.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    session: Session,
    Query(query): Query<ShopQuery>,
) -> Result<ShopTemplate> {
    let filter = query.to_filter();
    let (listing, brands) = tokio::join!(state.api().products(&filter), state.api().brands());

    let selected_brand = filter.brand;
    let brands = brands
        .inspect_err(|e| warn!(error = %e, "failed to load brands"))
        .unwrap_or_default()
        .into_iter()
        .map(|brand| SelectOption {
            value: brand.id.to_string(),
            label: brand.name,
            selected: Some(brand.id) == selected_brand,
        })
        .collect();

    let orderings = Ordering::ALL
        .into_iter()
        .map(|o| SelectOption {
            value: o.as_str().to_string(),
            label: o.label().to_string(),
            selected: o == filter.ordering,
        })
        .collect();

    let wishlist = local_wishlist(&state, &session, layout.user.is_some()).await;
    let results = ShopResults::new(&listing?, &query, filter.page(), &wishlist);

    Ok(ShopTemplate {
        layout,
        query,
        brands,
        orderings,
        results,
    })
}

/// Results fragment for the filter form (HTMX).
///
/// Superseded requests answer `204 No Content`, which HTMX leaves unswapped.
#[instrument(skip_all)]
pub async fn results(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Query(query): Query<ShopQuery>,
) -> Result<Response> {
    let filter = query.to_filter();
    let key = debounce_key(&session).await;

    let Some(listing) = state
        .debouncer()
        .run(key, state.api().products(&filter))
        .await
    else {
        debug!("shop filter superseded");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let wishlist = local_wishlist(&state, &session, user.is_some()).await;
    let results = ShopResults::new(&listing?, &query, filter.page(), &wishlist);
    Ok(ShopResultsTemplate { results }.into_response())
}

/// Product detail page.
#[instrument(skip(state, layout, session))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    session: Session,
    Path(id): Path<i64>,
) -> Result<ProductTemplate> {
    let id = ProductId::new(id);
    let product = match state.api().product(id).await {
        Ok(product) if product.is_active => product,
        Ok(_) | Err(emporium_api::ApiError::NotFound(_)) => {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        Err(e) => return Err(e.into()),
    };

    let wishlist = local_wishlist(&state, &session, layout.user.is_some()).await;
    let card = ProductCard::new(&product, &wishlist);

    Ok(ProductTemplate {
        layout,
        product_id: product.id,
        wishlisted: card.wishlisted,
        card,
        product,
    })
}

#[cfg(test)]
mod tests {
    use emporium_core::BrandId;

    use super::*;

    #[test]
    fn test_blank_form_fields_are_ignored() {
        let query = ShopQuery {
            search: "  ".to_string(),
            brand: String::new(),
            min_price: "abc".to_string(),
            max_price: "500".to_string(),
            ordering: "price_high_low".to_string(),
            ..ShopQuery::default()
        };
        let filter = query.to_filter();
        assert!(filter.search.is_none());
        assert!(filter.brand.is_none());
        assert!(filter.min_price.is_none());
        assert_eq!(filter.max_price, Some(Decimal::new(500, 0)));
        assert_eq!(filter.ordering, Ordering::PriceHighLow);
    }

    #[test]
    fn test_brand_and_page_parse() {
        let query = ShopQuery {
            brand: "7".to_string(),
            page: "3".to_string(),
            ordering: "bogus".to_string(),
            ..ShopQuery::default()
        };
        let filter = query.to_filter();
        assert_eq!(filter.brand, Some(BrandId::new(7)));
        assert_eq!(filter.page(), 3);
        assert_eq!(filter.ordering, Ordering::Newest);
    }

    #[test]
    fn test_base_url_drops_page_and_blanks() {
        let query = ShopQuery {
            search: "red shoe".to_string(),
            page: "4".to_string(),
            ..ShopQuery::default()
        };
        assert_eq!(query.base_url(), "/shop?search=red+shoe");
        assert_eq!(ShopQuery::default().base_url(), "/shop");
    }
}
