//! Integration tests for Emporium.
//!
//! [`MockBackend`] stands in for the commerce backend: a small axum app with
//! the REST endpoints the tested flows touch, plus the notification socket.
//! The storefront and admin binaries are served on ephemeral ports against it
//! and driven with a cookie-keeping `reqwest` client, like a browser would.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_session` - token refresh, logout and the notification socket
//! - `storefront_flows` - wishlist rollback, coupons, live notifications
//! - `admin_lockout` - role gate and account blocking

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{
        Query, Request, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use emporium_api::BackendConfig;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Password the mock accepts for every account.
pub const PASSWORD: &str = "correct horse";
/// Signs in with the admin role.
pub const ADMIN_EMAIL: &str = "ops@emporium.test";
/// Signs in as a regular customer.
pub const SHOPPER_EMAIL: &str = "asha@emporium.test";
/// The only coupon code the mock accepts.
pub const VALID_COUPON: &str = "SAVE10";
/// Refresh cookie issued at login.
pub const REFRESH_VALUE: &str = "refresh-1";

/// Mutable backend state, inspected and steered by tests.
#[derive(Debug, Default)]
struct Ledger {
    /// `"METHOD /path"` for every request received.
    calls: Vec<String>,
    /// The only access token currently accepted is `access-{serial}`.
    access_serial: u32,
    refresh_revoked: bool,
    reject_bearers: bool,
    reject_wishlist: bool,
}

impl Ledger {
    fn access_token(&self) -> String {
        format!("access-{}", self.access_serial)
    }

    fn accepts(&self, token: &str) -> bool {
        !self.reject_bearers && token == self.access_token()
    }
}

struct Shared {
    ledger: Mutex<Ledger>,
    notifications: broadcast::Sender<Value>,
}

impl Shared {
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process stand-in for the commerce backend.
#[derive(Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl MockBackend {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> io::Result<Self> {
        // Same provider the binaries install at startup.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let (notifications, _) = broadcast::channel(16);
        let shared = Arc::new(Shared {
            ledger: Mutex::default(),
            notifications,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(shared.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(error = %e, "mock backend stopped");
            }
        });

        Ok(Self { addr, shared })
    }

    /// Backend settings pointing at this mock.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated URLs do not parse.
    pub fn config(&self) -> io::Result<BackendConfig> {
        BackendConfig::new(
            &format!("http://{}/api/", self.addr),
            &format!("ws://{}/", self.addr),
        )
        .map_err(io::Error::other)
    }

    /// How many `method` requests reached `path` (e.g. `"/api/cart/"`).
    #[must_use]
    pub fn calls(&self, method: &str, path: &str) -> usize {
        let wanted = format!("{method} {path}");
        self.shared
            .ledger()
            .calls
            .iter()
            .filter(|call| **call == wanted)
            .count()
    }

    /// The access token the mock currently accepts.
    #[must_use]
    pub fn current_access(&self) -> String {
        self.shared.ledger().access_token()
    }

    /// Rotate the accepted access token, so the one clients hold is rejected
    /// until they refresh.
    pub fn expire_access(&self) {
        self.shared.ledger().access_serial += 1;
    }

    /// Reject every refresh attempt from now on.
    pub fn revoke_refresh(&self) {
        self.shared.ledger().refresh_revoked = true;
    }

    /// Reject every bearer token, fresh or not.
    pub fn reject_bearers(&self) {
        self.shared.ledger().reject_bearers = true;
    }

    /// Fail wishlist additions with a validation error.
    pub fn reject_wishlist(&self) {
        self.shared.ledger().reject_wishlist = true;
    }

    /// Push a notification to every open socket. Returns how many got it.
    #[must_use]
    pub fn notify(&self, id: u64, message: &str) -> usize {
        let frame = json!({
            "type": "notification",
            "notification": {
                "id": id,
                "message": message,
                "kind": "order",
                "is_read": false,
            },
        });
        self.shared.notifications.send(frame).unwrap_or(0)
    }
}

fn router(shared: Arc<Shared>) -> Router {
    let authed = Router::new()
        .route("/api/users/block/", post(empty_ok))
        .route("/api/cart/", get(cart))
        .route("/api/wishlist/", get(empty_list).post(add_to_wishlist))
        .route("/api/wishlist/{id}/", delete(no_content))
        .route("/api/orders/apply-coupon/", post(apply_coupon))
        .route("/api/notifications/", get(empty_list))
        .route("/api/admin/dashboard/", get(dashboard))
        .route_layer(middleware::from_fn_with_state(shared.clone(), require_bearer));

    Router::new()
        .route("/api/users/login/", post(login))
        .route("/api/users/token/refresh/", post(refresh))
        .route("/api/users/logout/", post(empty_ok))
        .route("/ws/notifications/", get(socket))
        .merge(authed)
        .layer(middleware::from_fn_with_state(shared.clone(), record))
        .with_state(shared)
}

async fn record(State(shared): State<Arc<Shared>>, request: Request, next: Next) -> Response {
    let call = format!("{} {}", request.method(), request.uri().path());
    debug!(%call, "mock backend request");
    shared.ledger().calls.push(call);
    next.run(request).await
}

async fn require_bearer(
    State(shared): State<Arc<Shared>>,
    request: Request,
    next: Next,
) -> Response {
    let accepted = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| shared.ledger().accepts(token));

    if accepted {
        next.run(request).await
    } else {
        unauthorized()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Given token not valid for any token type" })),
    )
        .into_response()
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(shared): State<Arc<Shared>>, Json(body): Json<Credentials>) -> Response {
    if body.password != PASSWORD {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "No active account found with the given credentials" })),
        )
            .into_response();
    }

    let is_admin = body.email == ADMIN_EMAIL;
    let user = json!({
        "id": if is_admin { 1 } else { 7 },
        "email": body.email,
        "first_name": if is_admin { "Ops" } else { "Asha" },
        "last_name": "Tester",
        "is_admin": is_admin,
    });
    let access = shared.ledger().access_token();

    (
        [(
            header::SET_COOKIE,
            format!("refresh_token={REFRESH_VALUE}; Path=/; HttpOnly"),
        )],
        Json(json!({ "access": access, "user": user })),
    )
        .into_response()
}

async fn refresh(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    let presented = cookie(&headers, "refresh_token");
    let ledger = shared.ledger();
    if ledger.refresh_revoked || presented.as_deref() != Some(REFRESH_VALUE) {
        return unauthorized();
    }
    Json(json!({ "access": ledger.access_token() })).into_response()
}

async fn empty_ok() -> Json<Value> {
    Json(json!({}))
}

async fn empty_list() -> Json<Value> {
    Json(json!([]))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn cart() -> Json<Value> {
    Json(json!({
        "items": [{
            "id": 1,
            "product": { "id": 5, "name": "Trail Runner", "price": "120.00", "stock": 9 },
            "quantity": 2,
        }],
        "total": "240.00",
    }))
}

async fn add_to_wishlist(State(shared): State<Arc<Shared>>) -> Response {
    if shared.ledger().reject_wishlist {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "This product is no longer available" })),
        )
            .into_response();
    }
    (StatusCode::CREATED, Json(json!({}))).into_response()
}

#[derive(Debug, Deserialize)]
struct CouponRequest {
    code: String,
}

async fn apply_coupon(Json(body): Json<CouponRequest>) -> Response {
    if body.code != VALID_COUPON {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid coupon code" })),
        )
            .into_response();
    }
    Json(json!({ "code": VALID_COUPON, "discount": "24.00", "total": "216.00" })).into_response()
}

async fn dashboard() -> Json<Value> {
    Json(json!({
        "total_orders": 4,
        "total_revenue": "1234.56",
        "total_users": 12,
        "total_products": 30,
        "pending_orders": 1,
    }))
}

#[derive(Debug, Deserialize)]
struct SocketQuery {
    #[serde(default)]
    token: String,
}

async fn socket(
    ws: WebSocketUpgrade,
    State(shared): State<Arc<Shared>>,
    Query(query): Query<SocketQuery>,
) -> Response {
    if !shared.ledger().accepts(&query.token) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // Subscribe before the upgrade completes so nothing sent after the
    // handshake is missed.
    let feed = shared.notifications.subscribe();
    ws.on_upgrade(move |socket| forward(socket, feed))
}

async fn forward(socket: WebSocket, mut feed: broadcast::Receiver<Value>) {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = feed.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("mock notification socket closed");
}

// =============================================================================
// Apps under test
// =============================================================================

/// Serve the storefront against `backend`. Returns its base URL.
///
/// # Errors
///
/// Returns an error if the app cannot be built or bound.
pub async fn spawn_storefront(backend: &MockBackend) -> io::Result<String> {
    use emporium_storefront::{config::StorefrontConfig, state::AppState};

    let config = StorefrontConfig::with_backend(backend.config()?);
    let state = AppState::new(config).map_err(io::Error::other)?;
    serve(emporium_storefront::app(state)).await
}

/// Serve the admin dashboard against `backend`. Returns its base URL.
///
/// # Errors
///
/// Returns an error if the app cannot be built or bound.
pub async fn spawn_admin(backend: &MockBackend) -> io::Result<String> {
    use emporium_admin::{config::AdminConfig, state::AppState};

    let config = AdminConfig::with_backend(backend.config()?);
    let state = AppState::new(config).map_err(io::Error::other)?;
    serve(emporium_admin::app(state)).await
}

async fn serve(app: Router) -> io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, service).await {
            error!(error = %e, "app under test stopped");
        }
    });
    Ok(format!("http://{addr}"))
}

/// A browser-like client: keeps cookies, does not follow redirects.
///
/// # Errors
///
/// Returns an error if the client cannot be built.
pub fn browser() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// Sign in through an app's login form.
///
/// # Errors
///
/// Returns the transport error if the request fails.
pub async fn sign_in(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
) -> reqwest::Result<reqwest::Response> {
    client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", email), ("password", PASSWORD)])
        .send()
        .await
}
