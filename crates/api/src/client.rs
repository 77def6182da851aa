//! HTTP plumbing: request dispatch, bearer attachment and refresh-on-401.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::{AuthTokens, REFRESH_COOKIE, SessionEvent, TokenStore};
use crate::cache::{CacheKey, CacheValue};
use crate::config::BackendConfig;
use crate::error::{ApiError, describe_error_body};

/// Path of the cookie-based token refresh endpoint. Never refreshed itself.
pub const REFRESH_PATH: &str = "users/token/refresh/";

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 64;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the commerce backend.
///
/// Cheap to clone. Public catalogue reads (brands, banners, product pages)
/// are cached for 5 minutes; everything user-scoped goes through
/// [`ApiClient::session`].
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    api_base: Url,
    ws_base: Url,
    cache: Cache<CacheKey, CacheValue>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend init).
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("emporium/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                api_base: config.api_base_url.clone(),
                ws_base: config.ws_base_url.clone(),
                cache,
                events,
            }),
        })
    }

    /// Bind a user's token store, giving access to authenticated endpoints.
    #[must_use]
    pub const fn session<'a, S: TokenStore>(&'a self, store: &'a S) -> Authed<'a, S> {
        Authed {
            client: self,
            store,
        }
    }

    /// Subscribe to session lifecycle events (logouts, refreshes).
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Drop every cached catalogue response.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    pub(crate) fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    pub(crate) fn cache(&self) -> &Cache<CacheKey, CacheValue> {
        &self.inner.cache
    }

    pub(crate) fn ws_base(&self) -> &Url {
        &self.inner.ws_base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.api_base.join(path.trim_start_matches('/'))?)
    }

    /// Send one request. No retry, no refresh.
    #[instrument(skip(self, call, bearer, refresh_cookie), fields(method = %call.method, path = %call.path))]
    pub(crate) async fn dispatch(
        &self,
        call: &Call,
        bearer: Option<&str>,
        refresh_cookie: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.url(&call.path)?;
        let mut request = self.inner.http.request(call.method.clone(), url);

        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(cookie) = refresh_cookie {
            request = request.header(
                reqwest::header::COOKIE,
                format!("{REFRESH_COOKIE}={cookie}"),
            );
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(status = %response.status(), "backend responded");
        Ok(response)
    }

    /// Send an unauthenticated request and decode the JSON body.
    pub(crate) async fn fetch_public<T: DeserializeOwned>(&self, call: Call) -> Result<T, ApiError> {
        let response = self.dispatch(&call, None, None).await?;
        decode(response).await
    }
}

// =============================================================================
// Call
// =============================================================================

/// A replayable request description.
///
/// Kept as plain data so the refresh path can resend it verbatim.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<serde_json::Value>,
}

impl Call {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub(crate) fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

// =============================================================================
// Authed
// =============================================================================

/// An [`ApiClient`] bound to one user's [`TokenStore`].
///
/// Attaches the bearer token to every request. On a 401 it refreshes once via
/// the refresh cookie and replays the request once. If the refresh fails, or
/// the replay is rejected too, the store is cleared, [`SessionEvent::LoggedOut`]
/// is broadcast, and the call fails with [`ApiError::SessionExpired`]. A 401
/// from the refresh endpoint itself is returned as-is.
pub struct Authed<'a, S> {
    client: &'a ApiClient,
    store: &'a S,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

impl<S: TokenStore> Authed<'_, S> {
    /// The underlying client.
    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        self.client
    }

    /// The bound token store.
    #[must_use]
    pub const fn store(&self) -> &S {
        self.store
    }

    /// Send a request with the retry-once-after-refresh policy.
    pub(crate) async fn execute(&self, call: &Call) -> Result<Response, ApiError> {
        let tokens = self.store.load().await;
        let response = self
            .client
            .dispatch(call, tokens.access_value().as_deref(), None)
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED || call.path == REFRESH_PATH {
            return Ok(response);
        }

        if tokens.is_empty() {
            // Drop any user record left without credentials.
            self.store.clear().await;
            return Err(ApiError::Unauthorized);
        }

        let Some(refresh_cookie) = tokens.refresh_value() else {
            return Err(self.expire("access token rejected and no refresh credential").await);
        };

        if let Err(e) = self.refresh(&refresh_cookie).await {
            warn!(error = %e, "token refresh failed");
            return Err(self.expire("token refresh failed").await);
        }

        let tokens = self.store.load().await;
        let retried = self
            .client
            .dispatch(call, tokens.access_value().as_deref(), None)
            .await?;

        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %call.path, "request rejected again after refresh");
            return Err(self.expire("access token rejected after refresh").await);
        }

        Ok(retried)
    }

    /// Exchange the refresh cookie for a new access token.
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_cookie: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .dispatch(&Call::post(REFRESH_PATH), None, Some(refresh_cookie))
            .await?;

        let rotated = refresh_cookie_from(&response);
        let body: RefreshResponse = decode(response).await?;

        self.store
            .save(AuthTokens::new(
                Some(body.access),
                rotated.or_else(|| Some(refresh_cookie.to_string())),
            ))
            .await;

        debug!("access token refreshed");
        self.client.broadcast(SessionEvent::Refreshed {
            subject: self.store.subject().await,
        });
        Ok(())
    }

    /// Clear credentials and broadcast the logout.
    async fn expire(&self, reason: &str) -> ApiError {
        let subject = self.store.subject().await;
        self.store.clear().await;

        warn!(subject = ?subject, reason, "session expired");
        self.client.broadcast(SessionEvent::LoggedOut {
            subject,
            reason: reason.to_string(),
        });

        ApiError::SessionExpired
    }

    /// Execute and decode a JSON body.
    pub(crate) async fn fetch<T: DeserializeOwned>(&self, call: Call) -> Result<T, ApiError> {
        let response = self.execute(&call).await?;
        decode(response).await
    }

    /// Execute and discard the body.
    pub(crate) async fn fetch_empty(&self, call: Call) -> Result<(), ApiError> {
        let response = self.execute(&call).await?;
        check(response).await.map(drop)
    }
}

// =============================================================================
// Response helpers
// =============================================================================

/// Turn a non-success response into an [`ApiError`].
pub(crate) async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(path));
    }

    if status.is_server_error() {
        tracing::error!(
            status = %status,
            path = %path,
            body = %body.chars().take(500).collect::<String>(),
            "backend returned server error"
        );
    }

    Err(ApiError::Status {
        status,
        message: describe_error_body(status, &body),
    })
}

/// Check status and decode the JSON body.
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check(response).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "failed to parse backend response"
        );
        ApiError::Parse(e)
    })
}

/// Refresh cookie set by a login or refresh response, if any.
pub(crate) fn refresh_cookie_from(response: &Response) -> Option<String> {
    response
        .cookies()
        .find(|cookie| cookie.name() == REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
