//! Session-related types.
//!
//! The browser session stands in for client-side storage: it holds the
//! backend credentials, the signed-in user, the local wishlist copy, the
//! applied coupon and pending toasts.

use emporium_core::{User, UserId};
use serde::{Deserialize, Serialize};

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.display_name(),
        }
    }
}

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
}

/// One-shot toast shown on the next rendered page or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    /// CSS class for the toast container.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "toast toast-success",
            FlashLevel::Error => "toast toast-error",
        }
    }
}

/// Session keys.
pub mod keys {
    /// Signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Backend bearer token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Backend refresh cookie value.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Local copy of wishlisted product ids.
    pub const WISHLIST: &str = "wishlist";

    /// Coupon quote applied at checkout.
    pub const COUPON: &str = "coupon";

    /// Pending toasts.
    pub const FLASH: &str = "flash";

    /// Stable per-browser key for debouncing.
    pub const DEBOUNCE_KEY: &str = "debounce_key";
}
