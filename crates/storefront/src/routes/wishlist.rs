//! Wishlist pages and the optimistic toggle.
//!
//! The session keeps a local copy of wishlisted product ids so listing pages
//! can mark hearts without a backend round trip. Toggling updates that copy
//! first, then asks the backend; a rejection rolls the copy back and shows an
//! error toast.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use emporium_core::{ProductId, Wishlist};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use super::{is_htmx, sign_in_again};
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAuth, SessionTokenStore, push_flash, take_flashes};
use crate::models::{Flash, session_keys};
use crate::state::AppState;
use crate::views::ProductCard;

/// The session's wishlist copy, loaded from the backend on first use.
///
/// Signed-out visitors always get an empty list.
pub(crate) async fn local_wishlist(state: &AppState, session: &Session, signed_in: bool) -> Wishlist {
    if !signed_in {
        return Wishlist::default();
    }
    if let Ok(Some(wishlist)) = session.get::<Wishlist>(session_keys::WISHLIST).await {
        return wishlist;
    }

    let store = SessionTokenStore::new(session.clone());
    match state.api().session(&store).wishlist().await {
        Ok(items) => {
            let wishlist = Wishlist::from_items(&items);
            save_wishlist(session, &wishlist).await;
            wishlist
        }
        Err(e) => {
            warn!(error = %e, "failed to load wishlist");
            Wishlist::default()
        }
    }
}

async fn save_wishlist(session: &Session, wishlist: &Wishlist) {
    if let Err(e) = session.insert(session_keys::WISHLIST, wishlist).await {
        warn!(error = %e, "failed to store wishlist copy");
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "wishlist/index.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
}

/// Toggle response: the new button plus any toasts.
#[derive(Template, WebTemplate)]
#[template(path = "fragments/wishlist_toggle.html")]
pub struct WishlistToggleTemplate {
    pub product_id: ProductId,
    pub wishlisted: bool,
    pub toasts: Vec<Flash>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: ProductId,
}

/// Wishlist page. Always reads the backend and refreshes the local copy.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
) -> Result<WishlistTemplate> {
    let items = state.api().session(&auth.tokens).wishlist().await?;
    let wishlist = Wishlist::from_items(&items);
    save_wishlist(auth.tokens.session(), &wishlist).await;

    let products = items
        .iter()
        .map(|item| ProductCard::new(&item.product, &wishlist))
        .collect();

    Ok(WishlistTemplate { layout, products })
}

/// Optimistically toggle a product.
#[instrument(skip_all, fields(user_id = %auth.user.id, product_id = %form.product_id))]
pub async fn toggle(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Form(form): Form<ToggleForm>,
) -> Response {
    let session = auth.tokens.session().clone();
    let mut wishlist = local_wishlist(&state, &session, true).await;

    let change = wishlist.toggle(form.product_id);
    save_wishlist(&session, &wishlist).await;

    let api = state.api().session(&auth.tokens);
    let result = if change.added {
        api.add_to_wishlist(form.product_id).await
    } else {
        api.remove_from_wishlist(form.product_id).await
    };

    match result {
        Ok(()) => {
            let message = if change.added {
                "Added to wishlist"
            } else {
                "Removed from wishlist"
            };
            push_flash(&session, Flash::success(message)).await;
        }
        Err(e) if e.is_auth() => return sign_in_again(&headers),
        Err(e) => {
            warn!(error = %e, "wishlist change rejected, rolling back");
            wishlist.rollback(change);
            save_wishlist(&session, &wishlist).await;
            push_flash(&session, Flash::error(e.user_message())).await;
        }
    }

    if !is_htmx(&headers) {
        return Redirect::to(&back_to(&headers)).into_response();
    }

    let toasts = take_flashes(&session).await;
    (
        AppendHeaders([("HX-Trigger", "wishlist-updated")]),
        WishlistToggleTemplate {
            product_id: form.product_id,
            wishlisted: wishlist.contains(form.product_id),
            toasts,
        },
    )
        .into_response()
}

/// Same-site path from the `Referer`, or the wishlist page.
fn back_to(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| url::Url::parse(r).ok())
        .map_or_else(|| "/wishlist".to_string(), |url| {
            url.query().map_or_else(
                || url.path().to_string(),
                |q| format!("{}?{q}", url.path()),
            )
        })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_back_to_keeps_path_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(back_to(&headers), "/wishlist");

        headers.insert(
            axum::http::header::REFERER,
            HeaderValue::from_static("https://evil.example/products/3?x=1"),
        );
        assert_eq!(back_to(&headers), "/products/3?x=1");
    }
}
