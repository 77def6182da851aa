//! Home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use chrono::Utc;
use emporium_api::ProductFilter;
use emporium_core::{BannerOffer, Brand};
use tower_sessions::Session;
use tracing::{instrument, warn};

use super::wishlist::local_wishlist;
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::state::AppState;
use crate::views::ProductCard;

/// Number of new arrivals on the home page.
const FEATURED_COUNT: usize = 8;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub banners: Vec<BannerOffer>,
    pub products: Vec<ProductCard>,
    pub brands: Vec<Brand>,
}

/// Home page: live banners, newest products, brands.
///
/// Banner and brand failures degrade to empty sections; only the product
/// listing is required.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    layout: Layout,
    session: Session,
) -> Result<HomeTemplate> {
    let api = state.api();
    let newest = ProductFilter::default();
    let (banners, brands, listing) =
        tokio::join!(api.banners(), api.brands(), api.products(&newest));

    let now = Utc::now();
    let banners = banners
        .inspect_err(|e| warn!(error = %e, "failed to load banners"))
        .unwrap_or_default()
        .into_iter()
        .filter(|banner| banner.is_showing_at(now))
        .collect();
    let brands = brands
        .inspect_err(|e| warn!(error = %e, "failed to load brands"))
        .unwrap_or_default();

    let wishlist = local_wishlist(&state, &session, layout.user.is_some()).await;
    let products = listing?
        .results
        .iter()
        .filter(|p| p.is_active)
        .take(FEATURED_COUNT)
        .map(|p| ProductCard::new(p, &wishlist))
        .collect();

    Ok(HomeTemplate {
        layout,
        banners,
        products,
        brands,
    })
}
