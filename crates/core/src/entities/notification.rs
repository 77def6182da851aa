//! User notifications, delivered by list endpoint and live socket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::NotificationId;

/// A notification addressed to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    /// Free-form category from the backend (`order`, `offer`, ...).
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
