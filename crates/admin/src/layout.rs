//! Per-request data the admin shell needs.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::middleware::{AdminAuthRejection, take_flashes};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::views::AdminUserView;

/// Sidebar and toast context for dashboard pages. Extracting it consumes
/// pending toasts.
pub struct Layout {
    pub admin_user: AdminUserView,
    /// Path of this request, for highlighting the active nav item.
    pub current_path: String,
    pub toasts: Vec<Flash>,
}

impl Layout {
    /// Whether `prefix` is the active section.
    #[must_use]
    pub fn is_active(&self, prefix: &str) -> bool {
        if prefix == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(prefix)
        }
    }
}

impl<S> FromRequestParts<S> for Layout
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AdminAuthRejection::MissingSession)?;

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::RedirectToLogin)?;

        Ok(Self {
            admin_user: AdminUserView::from(&user),
            current_path: parts.uri.path().to_string(),
            toasts: take_flashes(session).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_section() {
        let layout = Layout {
            admin_user: AdminUserView {
                name: "Ops".to_string(),
                email: "ops@example.com".to_string(),
                initials: "O".to_string(),
            },
            current_path: "/products/4/edit".to_string(),
            toasts: Vec::new(),
        };
        assert!(layout.is_active("/products"));
        assert!(!layout.is_active("/"));
        assert!(!layout.is_active("/orders"));
    }
}
