//! Notification list, mark-as-read, and the live stream.
//!
//! The live stream relays the backend notification socket to the browser as
//! server-sent events. One socket is opened per subscriber and closed when
//! the browser goes away, the backend closes it, or the user is signed out.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use emporium_api::SessionEvent;
use emporium_core::{Notification, NotificationId};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument, warn};

use super::{is_htmx, sign_in_again};
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAuth, push_flash, take_flashes};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::format_date;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: NotificationId,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created: String,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id,
            message: n.message.clone(),
            kind: n.kind.clone(),
            is_read: n.is_read,
            created: format_date(n.created_at),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "notifications/index.html")]
pub struct NotificationsTemplate {
    pub layout: Layout,
    pub notifications: Vec<NotificationView>,
    pub unread: usize,
}

/// One list row (HTMX swap after marking read).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/notification_item.html")]
pub struct NotificationItemTemplate {
    pub notification: NotificationView,
    pub toasts: Vec<Flash>,
}

/// Notification list, newest first as the backend returns them.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    auth: RequireAuth,
    layout: Layout,
) -> Result<NotificationsTemplate> {
    let notifications: Vec<NotificationView> = state
        .api()
        .session(&auth.tokens)
        .notifications()
        .await?
        .iter()
        .map(NotificationView::from)
        .collect();

    Ok(NotificationsTemplate {
        layout,
        unread: notifications.iter().filter(|n| !n.is_read).count(),
        notifications,
    })
}

/// Mark one notification read.
#[instrument(skip_all, fields(notification_id = id))]
pub async fn mark_read(
    State(state): State<AppState>,
    auth: RequireAuth,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let session = auth.tokens.session();
    let id = NotificationId::new(id);
    let api = state.api().session(&auth.tokens);

    match api.mark_notification_read(id).await {
        Ok(()) => {}
        Err(e) if e.is_auth() => return sign_in_again(&headers),
        Err(e) => {
            warn!(error = %e, "mark read failed");
            push_flash(session, Flash::error(e.user_message())).await;
        }
    }

    if !is_htmx(&headers) {
        return Redirect::to("/notifications").into_response();
    }

    // Re-read so the row reflects what the backend now says.
    let current = match api.notifications().await {
        Ok(list) => list.iter().find(|n| n.id == id).map(NotificationView::from),
        Err(e) => {
            warn!(error = %e, "failed to reload notifications");
            None
        }
    };

    match current {
        Some(notification) => NotificationItemTemplate {
            notification,
            toasts: take_flashes(session).await,
        }
        .into_response(),
        None => Redirect::to("/notifications").into_response(),
    }
}

/// Payload of one `notification` SSE event.
fn notification_event(notification: &Notification) -> Event {
    let view = NotificationView::from(notification);
    Event::default()
        .event("notification")
        .json_data(&view)
        .unwrap_or_else(|_| Event::default().event("notification").data(view.message))
}

/// Live notifications as server-sent events.
///
/// Emits `notification` events with a JSON body, and a final `logout` event
/// if the user's session ends while subscribed.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn stream(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let subject = auth.user.id.to_string();
    // Subscribe before connecting so a logout during the handshake is seen.
    let mut events = state.api().subscribe_events();
    let socket = state
        .api()
        .session(&auth.tokens)
        .subscribe_notifications()
        .await;

    let stream = async_stream::stream! {
        let mut socket = match socket {
            Ok(socket) => socket,
            Err(e) => {
                warn!(error = %e, "notification socket unavailable");
                if e.is_auth() {
                    yield Ok(Event::default().event("logout").data("session ended"));
                }
                return;
            }
        };

        loop {
            tokio::select! {
                next = socket.next() => match next {
                    Some(Ok(notification)) => yield Ok(notification_event(&notification)),
                    Some(Err(e)) => {
                        warn!(error = %e, "notification socket failed");
                        break;
                    }
                    None => {
                        debug!("notification socket closed by backend");
                        break;
                    }
                },
                event = events.recv() => match event {
                    Ok(SessionEvent::LoggedOut { subject: Some(ended), reason }) if ended == subject => {
                        debug!(reason = %reason, "session ended, closing notification stream");
                        yield Ok(Event::default().event("logout").data(reason));
                        break;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
        }

        socket.close().await;
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
