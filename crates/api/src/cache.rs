//! Cache types for public catalogue reads.

use emporium_core::{BannerOffer, Brand, Page, Product, ProductId};

/// Cache key for catalogue responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    /// Product listing, keyed by its encoded filter query.
    Products(String),
    Brands,
    Banners,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Page<Product>),
    Brands(Vec<Brand>),
    Banners(Vec<BannerOffer>),
}
