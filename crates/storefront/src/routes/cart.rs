//! Cart route handlers.
//!
//! Cart mutations are HTMX posts. Each answers with the fragment to swap plus
//! an out-of-band toast, and fires `cart-updated` so the header badge reloads.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use emporium_api::ApiError;
use emporium_core::{Cart, CartItemId, ProductId};
use serde::Deserialize;
use tracing::{instrument, warn};

use super::{is_htmx, sign_in_again};
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{OptionalAuth, RequireAuth, SessionTokenStore, push_flash, take_flashes};
use crate::models::Flash;
use crate::state::AppState;

/// One cart line for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartLineView {
                    id: item.id,
                    product_id: item.product.id,
                    name: item.product.name.clone(),
                    image: item.product.thumbnail().map(String::from),
                    unit_price: item.product.effective_price().to_string(),
                    quantity: item.quantity,
                    line_total: item.line_total().to_string(),
                })
                .collect(),
            subtotal: cart.subtotal().to_string(),
            item_count: cart.item_count(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: CartItemId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: CartItemId,
}

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart lines fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub toasts: Vec<Flash>,
}

/// Cart count badge fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Toasts only, for mutations that swap nothing else.
#[derive(Template, WebTemplate)]
#[template(path = "fragments/toasts.html")]
pub struct ToastsTemplate {
    pub toasts: Vec<Flash>,
}

/// Display cart page.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
) -> Result<CartShowTemplate> {
    let cart = state.api().session(&auth.tokens).cart().await?;
    Ok(CartShowTemplate {
        layout,
        cart: CartView::from(&cart),
    })
}

/// Add item to cart (HTMX).
#[instrument(skip_all, fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let session = auth.tokens.session().clone();
    let quantity = form.quantity.unwrap_or(1).max(1);

    match state
        .api()
        .session(&auth.tokens)
        .add_to_cart(form.product_id, quantity)
        .await
    {
        Ok(item) => {
            crate::error::add_breadcrumb(
                "cart",
                "Added to cart",
                &[("product_id", form.product_id.to_string())],
            );
            push_flash(&session, Flash::success(format!("Added {} to cart", item.product.name))).await;
        }
        Err(e) if e.is_auth() => return sign_in_again(&headers),
        Err(e) => {
            warn!(error = %e, "add to cart failed");
            push_flash(&session, Flash::error(e.user_message())).await;
        }
    }

    if !is_htmx(&headers) {
        return Redirect::to("/cart").into_response();
    }

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        ToastsTemplate {
            toasts: take_flashes(&session).await,
        },
    )
        .into_response()
}

/// Update line quantity (HTMX). Returns the refreshed cart lines.
#[instrument(skip_all, fields(item_id = %form.item_id, quantity = form.quantity))]
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let result = state
        .api()
        .session(&auth.tokens)
        .update_cart_item(form.item_id, form.quantity)
        .await;
    after_mutation(&state, &auth.tokens, &headers, result, "Cart updated").await
}

/// Remove a line (HTMX). Returns the refreshed cart lines.
#[instrument(skip_all, fields(item_id = %form.item_id))]
pub async fn remove(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let result = state
        .api()
        .session(&auth.tokens)
        .remove_cart_item(form.item_id)
        .await;
    after_mutation(&state, &auth.tokens, &headers, result, "Item removed").await
}

/// Toast the outcome and re-render the cart lines from the backend.
async fn after_mutation(
    state: &AppState,
    tokens: &SessionTokenStore,
    headers: &HeaderMap,
    result: std::result::Result<(), ApiError>,
    success: &str,
) -> Response {
    let session = tokens.session();
    match result {
        Ok(()) => push_flash(session, Flash::success(success)).await,
        Err(e) if e.is_auth() => return sign_in_again(headers),
        Err(e) => {
            warn!(error = %e, "cart change failed");
            push_flash(session, Flash::error(e.user_message())).await;
        }
    }

    if !is_htmx(headers) {
        return Redirect::to("/cart").into_response();
    }

    let cart = match state.api().session(tokens).cart().await {
        Ok(cart) => cart,
        Err(e) if e.is_auth() => return sign_in_again(headers),
        Err(e) => {
            warn!(error = %e, "failed to reload cart");
            push_flash(session, Flash::error(e.user_message())).await;
            return ToastsTemplate {
                toasts: take_flashes(session).await,
            }
            .into_response();
        }
    };

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from(&cart),
            toasts: take_flashes(session).await,
        },
    )
        .into_response()
}

/// Header badge. Signed-out visitors and backend failures show zero.
#[instrument(skip_all)]
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: tower_sessions::Session,
) -> CartCountTemplate {
    if user.is_none() {
        return CartCountTemplate { count: 0 };
    }

    let store = SessionTokenStore::new(session);
    let count = match state.api().session(&store).cart().await {
        Ok(cart) => cart.item_count(),
        Err(e) => {
            warn!(error = %e, "failed to load cart count");
            0
        }
    };
    CartCountTemplate { count }
}

#[cfg(test)]
mod tests {
    use emporium_core::{CartItem, Price};

    use super::*;

    #[test]
    fn test_cart_view_totals() {
        let product: emporium_core::Product = serde_json::from_value(serde_json::json!({
            "id": 3, "name": "Mug", "description": "", "price": "250.00",
            "discount_price": "200.00", "stock": 4, "category": "home", "images": []
        }))
        .unwrap_or_else(|e| panic!("fixture: {e}"));
        let cart = Cart {
            items: vec![CartItem {
                id: CartItemId::new(1),
                product,
                quantity: 2,
                subtotal: None,
            }],
            total: None,
        };

        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.subtotal, Price::from_minor(40_000).to_string());
        assert_eq!(view.items[0].unit_price, Price::from_minor(20_000).to_string());
    }
}
