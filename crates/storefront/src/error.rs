//! Unified error handling with Sentry integration.
//!
//! Page handlers return `Result<T, AppError>`. Mutating HTMX handlers usually
//! turn backend failures into toasts instead (see [`crate::middleware::flash`]).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::ApiError;
use thiserror::Error;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api(ApiError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Api(ApiError::Unauthorized | ApiError::SessionExpired) => StatusCode::UNAUTHORIZED,
            Self::Api(ApiError::Status { status, .. }) if status.is_client_error() => {
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The API client clears the session's credentials and user before
        // returning either of these, so the login page is reachable.
        if let Self::Api(ApiError::Unauthorized | ApiError::SessionExpired) = self {
            return Redirect::to("/auth/login").into_response();
        }

        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Api(e) => e.user_message(),
            Self::Session(_) => "Internal server error".to_string(),
            Self::NotFound(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after sign-in.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String(value.clone()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("order".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::NotFound("/api/products/9/".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Status {
                status: reqwest_status(400),
                message: "Invalid coupon code".to_string(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Status {
                status: reqwest_status(500),
                message: "boom".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_expired_session_redirects_to_login() {
        let response = AppError::Api(ApiError::SessionExpired).into_response();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[LOCATION], "/auth/login");
    }

    fn reqwest_status(code: u16) -> emporium_api::StatusCode {
        emporium_api::StatusCode::from_u16(code).unwrap_or(emporium_api::StatusCode::BAD_REQUEST)
    }
}
