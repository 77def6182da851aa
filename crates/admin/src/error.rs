//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use emporium_api::ApiError;
use thiserror::Error;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The API client clears the session's credentials and user before
        // returning either of these, so the login page is reachable.
        if let Self::Api(ApiError::Unauthorized | ApiError::SessionExpired) = self {
            return Redirect::to("/auth/login").into_response();
        }

        let status = match &self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Api(ApiError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Api(ApiError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Api(ApiError::Status { status, .. }) if status.as_u16() == 403 => {
                StatusCode::FORBIDDEN
            }
            Self::Api(ApiError::Status { status, .. }) if status.is_client_error() => {
                StatusCode::BAD_REQUEST
            }
            Self::Api(_) => StatusCode::BAD_GATEWAY,
        };

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Session(_) => "Internal server error".to_string(),
            Self::Api(e) => e.user_message(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from the signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_status(code: u16) -> AppError {
        AppError::Api(ApiError::Status {
            status: emporium_api::StatusCode::from_u16(code)
                .unwrap_or(emporium_api::StatusCode::BAD_REQUEST),
            message: "rejected".to_string(),
        })
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Api(ApiError::NotFound("/api/admin/coupons/12/".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(backend_status(403)), StatusCode::FORBIDDEN);
        assert_eq!(get_status(backend_status(400)), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(backend_status(502)), StatusCode::BAD_GATEWAY);
        assert_eq!(
            get_status(AppError::Api(ApiError::RateLimited(30))),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_expired_session_redirects() {
        let response = AppError::Api(ApiError::SessionExpired).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
