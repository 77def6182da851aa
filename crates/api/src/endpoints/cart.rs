//! Cart and wishlist endpoints.

use emporium_core::{Cart, CartItem, CartItemId, ProductId, WishlistItem};
use tracing::instrument;

use crate::auth::TokenStore;
use crate::client::{Authed, Call};
use crate::error::ApiError;

impl<S: TokenStore> Authed<'_, S> {
    /// Current cart.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        self.fetch(Call::get("cart/")).await
    }

    /// Add a product to the cart. The backend merges with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] when stock is insufficient.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        product: ProductId,
        quantity: u32,
    ) -> Result<CartItem, ApiError> {
        let call = Call::post("cart/").json(&serde_json::json!({
            "product_id": product,
            "quantity": quantity.max(1),
        }))?;
        self.fetch(call).await
    }

    /// Change a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is gone or stock is insufficient.
    #[instrument(skip(self))]
    pub async fn update_cart_item(&self, item: CartItemId, quantity: u32) -> Result<(), ApiError> {
        if quantity == 0 {
            return self.remove_cart_item(item).await;
        }
        let call = Call::patch(format!("cart/{item}/"))
            .json(&serde_json::json!({ "quantity": quantity }))?;
        self.fetch_empty(call).await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_cart_item(&self, item: CartItemId) -> Result<(), ApiError> {
        self.fetch_empty(Call::delete(format!("cart/{item}/"))).await
    }

    /// Wishlist entries.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn wishlist(&self) -> Result<Vec<WishlistItem>, ApiError> {
        self.fetch(Call::get("wishlist/")).await
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the product.
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(&self, product: ProductId) -> Result<(), ApiError> {
        let call = Call::post("wishlist/").json(&serde_json::json!({ "product_id": product }))?;
        self.fetch_empty(call).await
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(&self, product: ProductId) -> Result<(), ApiError> {
        self.fetch_empty(Call::delete(format!("wishlist/{product}/")))
            .await
    }
}
