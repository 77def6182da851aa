//! User management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use emporium_core::{Page, User, UserId};
use serde::Deserialize;
use tracing::{error, instrument};

use super::is_htmx;
use crate::error::Result;
use crate::filters;
use crate::layout::Layout;
use crate::middleware::{RequireAdmin, debounce_key, push_flash};
use crate::models::Flash;
use crate::state::AppState;
use crate::views::{Pagination, format_datetime, page_number};

const PAGE_SIZE: u64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub search: Option<String>,
    pub page: Option<String>,
}

impl UsersQuery {
    fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct BlockForm {
    pub blocked: bool,
}

/// User row for templates.
#[derive(Debug, Clone)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub joined: String,
    pub is_admin: bool,
    pub is_blocked: bool,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        let (status, status_class) = if user.is_blocked {
            ("Blocked", "bg-red-100 text-red-700")
        } else {
            ("Active", "bg-green-100 text-green-700")
        };
        Self {
            id: user.id,
            name: user.display_name(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            joined: format_datetime(user.date_joined),
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
            status,
            status_class,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub layout: Layout,
    pub search: String,
    pub users: Vec<UserView>,
    pub pagination: Pagination,
}

/// Users table fragment (HTMX search).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/users_table.html")]
pub struct UsersTableTemplate {
    pub users: Vec<UserView>,
    pub pagination: Pagination,
}

/// One row after a block toggle, with toasts.
#[derive(Template, WebTemplate)]
#[template(path = "fragments/user_row.html")]
pub struct UserRowTemplate {
    pub user: UserView,
    pub toasts: Vec<Flash>,
}

fn table(page: &Page<User>, search: Option<&str>, page_no: u32) -> (Vec<UserView>, Pagination) {
    let base = search.map_or_else(
        || "/users".to_string(),
        |term| {
            format!(
                "/users?search={}",
                url::form_urlencoded::byte_serialize(term.as_bytes()).collect::<String>()
            )
        },
    );
    (
        page.results.iter().map(UserView::from).collect(),
        Pagination::new(
            &base,
            page_no,
            page.has_previous(),
            page.has_next(),
            page.total_pages(PAGE_SIZE),
        ),
    )
}

/// Users list page.
#[instrument(skip(state, admin, layout))]
pub async fn index(
    State(state): State<AppState>,
    admin: RequireAdmin,
    mut layout: Layout,
    Query(query): Query<UsersQuery>,
) -> Result<UsersIndexTemplate> {
    let page_no = page_number(query.page.as_deref());
    let page = match state
        .api()
        .session(&admin.tokens)
        .admin_users(query.term(), page_no)
        .await
    {
        Ok(page) => page,
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(error = %e, "failed to fetch users");
            layout.toasts.push(Flash::error(e.user_message()));
            Page::default()
        }
    };

    let (users, pagination) = table(&page, query.term(), page_no);
    Ok(UsersIndexTemplate {
        search: query.term().unwrap_or_default().to_string(),
        layout,
        users,
        pagination,
    })
}

/// Debounced search results (HTMX). A superseded keystroke gets 204.
#[instrument(skip(state, admin))]
pub async fn search(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Query(query): Query<UsersQuery>,
) -> Result<Response> {
    let key = format!("{}:users", debounce_key(admin.tokens.session()).await);
    let page_no = page_number(query.page.as_deref());
    let api = state.api().session(&admin.tokens);

    let Some(result) = state
        .debouncer()
        .run(key, api.admin_users(query.term(), page_no))
        .await
    else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let (users, pagination) = table(&result?, query.term(), page_no);
    Ok(UsersTableTemplate { users, pagination }.into_response())
}

/// Block or unblock a user. Admins cannot block themselves from here.
#[instrument(skip(state, admin, headers))]
pub async fn set_blocked(
    State(state): State<AppState>,
    admin: RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<UserId>,
    Form(form): Form<BlockForm>,
) -> Result<Response> {
    let htmx = is_htmx(&headers);

    if id == admin.user.id && form.blocked {
        let flash = Flash::error("You cannot block your own account");
        if htmx {
            return Ok((
                [("HX-Reswap", "none")],
                super::ToastsTemplate {
                    toasts: vec![flash],
                },
            )
                .into_response());
        }
        push_flash(admin.tokens.session(), flash).await;
        return Ok(Redirect::to("/users").into_response());
    }

    match state
        .api()
        .session(&admin.tokens)
        .admin_set_user_blocked(id, form.blocked)
        .await
    {
        Ok(user) => {
            let flash = Flash::success(if user.is_blocked {
                format!("Blocked {}", user.email)
            } else {
                format!("Unblocked {}", user.email)
            });
            if htmx {
                return Ok(UserRowTemplate {
                    user: UserView::from(&user),
                    toasts: vec![flash],
                }
                .into_response());
            }
            push_flash(admin.tokens.session(), flash).await;
        }
        Err(e) if e.is_auth() => return Err(e.into()),
        Err(e) => {
            error!(user_id = %id, error = %e, "failed to change block state");
            let flash = Flash::error(e.user_message());
            if htmx {
                return Ok((
                    [("HX-Reswap", "none")],
                    super::ToastsTemplate {
                        toasts: vec![flash],
                    },
                )
                    .into_response());
            }
            push_flash(admin.tokens.session(), flash).await;
        }
    }
    Ok(Redirect::to("/users").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(blocked: bool) -> User {
        serde_json::from_value(serde_json::json!({
            "id": 9,
            "email": "kiran@example.com",
            "first_name": "Kiran",
            "is_blocked": blocked,
        }))
        .unwrap()
    }

    #[test]
    fn test_user_view_status() {
        let view = UserView::from(&user(true));
        assert_eq!(view.status, "Blocked");
        assert_eq!(view.name, "Kiran");
        assert_eq!(view.joined, "-");
        assert_eq!(UserView::from(&user(false)).status, "Active");
    }

    #[test]
    fn test_row_fragment_offers_opposite_action() {
        let html = UserRowTemplate {
            user: UserView::from(&user(true)),
            toasts: vec![Flash::success("Blocked kiran@example.com")],
        }
        .render()
        .unwrap();
        assert!(html.contains("name=\"blocked\" value=\"false\""));
        assert!(html.contains("hx-swap-oob"));
    }
}
