//! Account holder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A storefront account as returned by `users/profile/` and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

impl User {
    /// Name to greet the user with, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_user_payload() {
        let user: User = serde_json::from_str(r#"{"id": 3, "email": "a@b.co"}"#).unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.display_name(), "a@b.co");
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let user: User = serde_json::from_str(
            r#"{"id": 3, "email": "a@b.co", "first_name": "Asha", "last_name": " Rao ", "is_admin": true}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "Asha Rao");
        assert!(user.is_admin);
    }
}
