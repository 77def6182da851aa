//! Credential storage and session lifecycle events.
//!
//! The backend issues a short-lived bearer access token in the JSON body and a
//! long-lived `refresh_token` cookie. Where those live is up to the caller:
//! the web binaries keep them in the browser's server-side session, tests keep
//! them in memory. Both implement [`TokenStore`].

use std::future::Future;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

/// Name of the backend cookie carrying the refresh credential.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Access and refresh credentials for one signed-in user.
#[derive(Debug, Default)]
pub struct AuthTokens {
    /// Bearer token attached to API requests.
    pub access: Option<SecretString>,
    /// Value of the backend's refresh cookie.
    pub refresh: Option<SecretString>,
}

impl AuthTokens {
    /// Build from plain strings, treating empty values as absent.
    #[must_use]
    pub fn new(access: Option<String>, refresh: Option<String>) -> Self {
        Self {
            access: access.filter(|s| !s.is_empty()).map(SecretString::from),
            refresh: refresh.filter(|s| !s.is_empty()).map(SecretString::from),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none()
    }

    /// Copy of the access token, for header construction.
    #[must_use]
    pub fn access_value(&self) -> Option<String> {
        self.access.as_ref().map(|s| s.expose_secret().to_string())
    }

    /// Copy of the refresh cookie value.
    #[must_use]
    pub fn refresh_value(&self) -> Option<String> {
        self.refresh.as_ref().map(|s| s.expose_secret().to_string())
    }
}

/// Persistence for one user's [`AuthTokens`].
///
/// Methods return `Send` futures so stores can be used from axum handlers.
pub trait TokenStore: Send + Sync {
    /// Current tokens (empty when signed out).
    fn load(&self) -> impl Future<Output = AuthTokens> + Send;

    /// Replace the stored tokens.
    fn save(&self, tokens: AuthTokens) -> impl Future<Output = ()> + Send;

    /// Forget all tokens (and any cached user).
    fn clear(&self) -> impl Future<Output = ()> + Send;

    /// Identifier attached to [`SessionEvent`]s, usually the user id.
    fn subject(&self) -> impl Future<Output = Option<String>> + Send;
}

/// Session lifecycle broadcast from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens were rejected and could not be refreshed; the store is cleared.
    LoggedOut {
        subject: Option<String>,
        reason: String,
    },
    /// A refresh succeeded and the access token was replaced.
    Refreshed { subject: Option<String> },
}

/// In-memory [`TokenStore`], cheaply cloneable.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<MemoryTokens>>,
}

#[derive(Debug, Default)]
struct MemoryTokens {
    tokens: AuthTokens,
    subject: Option<String>,
}

impl MemoryTokenStore {
    /// Store seeded with tokens.
    #[must_use]
    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        let tokens = AuthTokens::new(access.map(String::from), refresh.map(String::from));
        Self {
            inner: Arc::new(RwLock::new(MemoryTokens {
                tokens,
                subject: None,
            })),
        }
    }

    /// Set the subject reported in events.
    pub async fn set_subject(&self, subject: impl Into<String>) {
        self.inner.write().await.subject = Some(subject.into());
    }

    /// Current access token, for assertions.
    pub async fn access_token(&self) -> Option<String> {
        self.inner.read().await.tokens.access_value()
    }

    /// Current refresh cookie value, for assertions.
    pub async fn refresh_token(&self) -> Option<String> {
        self.inner.read().await.tokens.refresh_value()
    }
}

impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> AuthTokens {
        let guard = self.inner.read().await;
        AuthTokens::new(guard.tokens.access_value(), guard.tokens.refresh_value())
    }

    async fn save(&self, tokens: AuthTokens) {
        self.inner.write().await.tokens = tokens;
    }

    async fn clear(&self) {
        self.inner.write().await.tokens = AuthTokens::default();
    }

    async fn subject(&self) -> Option<String> {
        self.inner.read().await.subject.clone()
    }
}
