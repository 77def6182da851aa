//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state, toasts and the
//! non-admin attempt counter.

use emporium_core::{User, UserId};
use serde::{Deserialize, Serialize};

/// Session-stored identity of whoever signed in.
///
/// Non-admins can hold a session too; the lockout middleware decides what
/// they may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    /// Role as reported by the backend at sign-in.
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.display_name(),
            is_admin: user.is_admin,
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

/// One-shot toast shown on the next rendered page.
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

    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "toast toast-success",
            FlashLevel::Error => "toast toast-error",
        }
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Signed-in user (admin or not).
    pub const CURRENT_USER: &str = "current_user";

    /// Backend bearer token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Backend refresh cookie value.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Pending toasts.
    pub const FLASH: &str = "flash";

    /// Stable per-browser key for debouncing searches.
    pub const DEBOUNCE_KEY: &str = "debounce_key";

    /// Number of admin pages opened by a signed-in non-admin.
    pub const LOCKOUT_ATTEMPTS: &str = "admin_lockout_attempts";
}
