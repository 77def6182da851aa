//! Backend entities as they appear on the wire.

pub mod banner;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod notification;
pub mod order;
pub mod page;
pub mod user;

pub use banner::BannerOffer;
pub use cart::{Cart, CartItem, Wishlist, WishlistChange, WishlistItem};
pub use catalog::{Brand, Product};
pub use coupon::{Coupon, CouponQuote};
pub use notification::Notification;
pub use order::{Order, OrderItem, ShippingInfo};
pub use page::Page;
pub use user::User;
