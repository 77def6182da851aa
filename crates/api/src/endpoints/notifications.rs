//! Notification list and the live notification socket.

use emporium_core::{Notification, NotificationId};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::auth::TokenStore;
use crate::client::{Authed, Call};
use crate::error::ApiError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

impl<S: TokenStore> Authed<'_, S> {
    /// All notifications for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if not signed in or the request fails.
    #[instrument(skip(self))]
    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.fetch(Call::get("notifications/")).await
    }

    /// Mark one notification as read.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<(), ApiError> {
        self.fetch_empty(Call::patch(format!("notifications/{id}/read/")))
            .await
    }

    /// Open the live notification socket for the signed-in user.
    ///
    /// The access token travels in the query string. A handshake rejected with
    /// 401 goes through one authenticated REST call (which refreshes the
    /// token, or expires the session) and is then retried once.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when signed out, or the socket error.
    #[instrument(skip(self))]
    pub async fn subscribe_notifications(&self) -> Result<NotificationStream, ApiError> {
        match self.connect_socket().await {
            Err(ApiError::WebSocket(tungstenite::Error::Http(response)))
                if response.status().as_u16() == 401 =>
            {
                debug!("notification socket rejected token, refreshing");
                self.notifications().await?;
                self.connect_socket().await
            }
            other => other,
        }
    }

    async fn connect_socket(&self) -> Result<NotificationStream, ApiError> {
        let Some(token) = self.store().load().await.access_value() else {
            return Err(ApiError::Unauthorized);
        };

        let url = socket_url(self.client().ws_base(), &token)?;
        let (socket, _) = connect_async(url.as_str()).await?;
        debug!("notification socket open");

        Ok(NotificationStream { socket })
    }
}

/// `{ws_base}ws/notifications/?token=...`
fn socket_url(base: &Url, token: &str) -> Result<Url, ApiError> {
    let mut url = base.join("ws/notifications/")?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Live notifications from the backend socket.
///
/// Dropping the stream closes the connection.
pub struct NotificationStream {
    socket: Socket,
}

impl NotificationStream {
    /// Next notification, or `None` once the backend closes the socket.
    ///
    /// Frames that are not notifications are skipped.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the socket fails.
    pub async fn next(&mut self) -> Option<Result<Notification, ApiError>> {
        while let Some(frame) = self.socket.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(notification) = parse_frame(text.as_str()) {
                        return Some(Ok(notification));
                    }
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    /// Close the socket politely.
    pub async fn close(mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!(error = %e, "notification socket close failed");
        }
    }
}

/// Accepts either a bare notification or `{"type": ..., "notification": {...}}`.
fn parse_frame(text: &str) -> Option<Notification> {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparseable notification frame");
            return None;
        }
    };

    let payload = value.get("notification").cloned().unwrap_or(value);
    serde_json::from_value(payload)
        .inspect_err(|e| debug!(error = %e, "ignoring non-notification frame"))
        .ok()
}
