//! Backend client errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend rejected the request with a message meant for the user.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request needs a signed-in user and there is none.
    #[error("Not signed in")]
    Unauthorized,

    /// Access token was rejected and could not be refreshed. The token store
    /// has been cleared and a logout event broadcast.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Notification socket failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A configured or derived URL is invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the user needs to sign in again.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::SessionExpired)
    }

    /// Message safe to show in a toast.
    ///
    /// Backend validation messages are passed through; transport failures are
    /// replaced with a generic line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::NotFound(_) => "That item no longer exists".to_string(),
            Self::Unauthorized => "Please sign in to continue".to_string(),
            Self::SessionExpired => "Your session expired, please sign in again".to_string(),
            Self::RateLimited(_) => "Too many requests, please slow down".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::WebSocket(_) | Self::InvalidUrl(_) => {
                "Something went wrong, please try again".to_string()
            }
        }
    }
}

/// Flatten a backend error body into one readable line.
///
/// Handles `{"detail": "..."}`, `{"error": "..."}`, `{"message": "..."}`,
/// field maps like `{"email": ["already taken"]}`, and bare strings/lists.
/// Falls back to the status reason when the body says nothing useful.
#[must_use]
pub fn describe_error_body(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() || trimmed.starts_with('<') {
            fallback()
        } else {
            trimmed.chars().take(200).collect()
        };
    };

    let message = flatten(&value, None);
    if message.is_empty() { fallback() } else { message }
}

fn flatten(value: &serde_json::Value, field: Option<&str>) -> String {
    use serde_json::Value;

    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| flatten(item, None))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => {
            for key in ["detail", "error", "message"] {
                if let Some(inner) = map.get(key) {
                    return flatten(inner, None);
                }
            }
            map.iter()
                .map(|(key, inner)| {
                    let label = (key != "non_field_errors").then_some(key.as_str());
                    flatten(inner, label)
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("; ")
        }
        Value::Null => String::new(),
        other => other.to_string(),
    };

    match field {
        Some(name) if !text.is_empty() => format!("{name}: {text}"),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_body() {
        assert_eq!(
            describe_error_body(StatusCode::BAD_REQUEST, r#"{"detail": "Invalid coupon code"}"#),
            "Invalid coupon code"
        );
    }

    #[test]
    fn test_field_map_body() {
        let body = r#"{"email": ["This field must be unique."], "non_field_errors": ["Try again."]}"#;
        assert_eq!(
            describe_error_body(StatusCode::BAD_REQUEST, body),
            "email: This field must be unique.; Try again."
        );
    }

    #[test]
    fn test_html_or_empty_body_uses_reason() {
        assert_eq!(
            describe_error_body(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "Bad Gateway"
        );
        assert_eq!(describe_error_body(StatusCode::CONFLICT, ""), "Conflict");
        assert_eq!(describe_error_body(StatusCode::CONFLICT, "{}"), "Conflict");
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = ApiError::InvalidUrl(url::ParseError::EmptyHost);
        assert_eq!(err.user_message(), "Something went wrong, please try again");
        assert!(ApiError::SessionExpired.is_auth());
    }
}
