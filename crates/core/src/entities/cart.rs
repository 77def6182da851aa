//! Cart and wishlist entities, plus the local wishlist copy used for
//! optimistic toggling.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::Product;
use crate::types::{CartItemId, Price, ProductId, WishlistItemId};

/// A line in the shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: u32,
    /// Line total as computed by the backend, when it sends one.
    #[serde(default)]
    pub subtotal: Option<Price>,
}

impl CartItem {
    /// Line total: the backend's figure if present, else unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.subtotal
            .unwrap_or_else(|| self.product.effective_price().times(self.quantity))
    }
}

/// The signed-in user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total: Option<Price>,
}

impl Cart {
    /// Sum of line totals, or the backend total when provided.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.total
            .unwrap_or_else(|| self.items.iter().map(CartItem::line_total).sum())
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A saved product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub product: Product,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// Local copy of which products are wishlisted.
///
/// Toggles apply immediately and hand back a [`WishlistChange`]; if the backend
/// rejects the change the caller passes it to [`Wishlist::rollback`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wishlist {
    products: BTreeSet<ProductId>,
}

/// A pending optimistic wishlist mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WishlistChange {
    pub product: ProductId,
    /// `true` if the toggle added the product, `false` if it removed it.
    pub added: bool,
}

impl Wishlist {
    /// Build the local copy from the backend's list.
    #[must_use]
    pub fn from_items(items: &[WishlistItem]) -> Self {
        Self {
            products: items.iter().map(|item| item.product.id).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, product: ProductId) -> bool {
        self.products.contains(&product)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Flip membership locally and describe what changed.
    pub fn toggle(&mut self, product: ProductId) -> WishlistChange {
        let added = self.products.insert(product);
        if !added {
            self.products.remove(&product);
        }
        WishlistChange { product, added }
    }

    /// Undo a change the backend did not accept.
    pub fn rollback(&mut self, change: WishlistChange) {
        if change.added {
            self.products.remove(&change.product);
        } else {
            self.products.insert(change.product);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::catalog::tests::product;

    #[test]
    fn test_cart_subtotal_from_lines() {
        let cart = Cart {
            items: vec![
                CartItem {
                    id: CartItemId::new(1),
                    product: product(1, 1_000, Some(800)),
                    quantity: 2,
                    subtotal: None,
                },
                CartItem {
                    id: CartItemId::new(2),
                    product: product(2, 500, None),
                    quantity: 1,
                    subtotal: None,
                },
            ],
            total: None,
        };
        assert_eq!(cart.subtotal(), Price::from_minor(2_100));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_cart_prefers_backend_total() {
        let cart = Cart {
            items: vec![CartItem {
                id: CartItemId::new(1),
                product: product(1, 1_000, None),
                quantity: 1,
                subtotal: Some(Price::from_minor(900)),
            }],
            total: Some(Price::from_minor(950)),
        };
        assert_eq!(cart.items[0].line_total(), Price::from_minor(900));
        assert_eq!(cart.subtotal(), Price::from_minor(950));
    }

    #[test]
    fn test_wishlist_toggle_and_rollback() {
        let mut wishlist = Wishlist::default();
        let id = ProductId::new(7);

        let added = wishlist.toggle(id);
        assert!(added.added);
        assert!(wishlist.contains(id));

        wishlist.rollback(added);
        assert!(!wishlist.contains(id));

        wishlist.toggle(id);
        let removed = wishlist.toggle(id);
        assert!(!removed.added);
        assert!(!wishlist.contains(id));
        wishlist.rollback(removed);
        assert!(wishlist.contains(id));
    }
}
