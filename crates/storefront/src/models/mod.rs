//! Session-held models.

pub mod session;

pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
