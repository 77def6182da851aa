//! Sign-in, sign-up and profile endpoints.

use emporium_core::User;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::{AuthTokens, SessionEvent, TokenStore};
use crate::client::{ApiClient, Authed, Call, check, decode, refresh_cookie_from};
use crate::error::ApiError;

/// Body of a successful login: access token plus the signed-in user.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    user: User,
}

/// New account details.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Editable profile fields. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ApiClient {
    /// Sign in with email and password, saving the issued tokens into `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with the backend's message for bad
    /// credentials or blocked accounts.
    #[instrument(skip(self, store, password))]
    pub async fn login<S: TokenStore>(
        &self,
        store: &S,
        email: &str,
        password: &str,
    ) -> Result<User, ApiError> {
        let call = Call::post("users/login/").json(&serde_json::json!({
            "email": email,
            "password": password,
        }))?;
        self.sign_in(store, call).await
    }

    /// Sign in with a Google Identity Services credential (ID token).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the credential.
    #[instrument(skip_all)]
    pub async fn google_login<S: TokenStore>(
        &self,
        store: &S,
        credential: &str,
    ) -> Result<User, ApiError> {
        let call =
            Call::post("users/google-login/").json(&serde_json::json!({ "credential": credential }))?;
        self.sign_in(store, call).await
    }

    async fn sign_in<S: TokenStore>(&self, store: &S, call: Call) -> Result<User, ApiError> {
        let response = self.dispatch(&call, None, None).await?;
        let refresh = refresh_cookie_from(&response);
        if refresh.is_none() && response.status().is_success() {
            warn!("login response carried no refresh cookie; session cannot be refreshed");
        }

        let body: LoginResponse = decode(response).await?;
        store
            .save(AuthTokens::new(Some(body.access), refresh))
            .await;

        info!(user_id = %body.user.id, "signed in");
        Ok(body.user)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Status`] with field errors (e.g. email taken).
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        self.fetch_public(Call::post("users/register/").json(registration)?)
            .await
    }
}

impl<S: TokenStore> Authed<'_, S> {
    /// Sign out: tell the backend to drop the refresh cookie, then clear the
    /// store regardless of the outcome and broadcast
    /// [`SessionEvent::LoggedOut`]. Backend failures are logged only.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        let tokens = self.store().load().await;
        let subject = self.store().subject().await;
        let result = self
            .client()
            .dispatch(
                &Call::post("users/logout/"),
                tokens.access_value().as_deref(),
                tokens.refresh_value().as_deref(),
            )
            .await;

        match result {
            Ok(response) => {
                if let Err(e) = check(response).await {
                    warn!(error = %e, "backend logout rejected");
                }
            }
            Err(e) => warn!(error = %e, "backend logout failed"),
        }

        self.store().clear().await;
        self.client().broadcast(SessionEvent::LoggedOut {
            subject,
            reason: "signed out".to_string(),
        });
    }

    /// Current user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<User, ApiError> {
        self.fetch(Call::get("users/profile/")).await
    }

    /// Update profile fields.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails server-side.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.fetch(Call::patch("users/profile/").json(update)?).await
    }

    /// Ask the backend to block the signed-in account.
    ///
    /// Sent after repeated attempts to open the admin dashboard without the
    /// admin role.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn block_self(&self) -> Result<(), ApiError> {
        self.fetch_empty(Call::post("users/block/")).await
    }
}
