//! Typed wrappers around backend endpoints, grouped by area.
//!
//! Public reads live on [`crate::ApiClient`]; anything needing a signed-in
//! user lives on [`crate::Authed`].

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod notifications;
pub mod orders;

/// Encode a 1-based page number as a query pair, omitting page 1.
pub(crate) fn page_query(page: u32) -> Vec<(String, String)> {
    if page > 1 {
        vec![("page".to_string(), page.to_string())]
    } else {
        Vec::new()
    }
}
