//! Emporium Core - Shared types library.
//!
//! This crate provides the types used across all Emporium components:
//! - `api` - Client for the commerce backend (REST + notification socket)
//! - `storefront` - Public-facing shop
//! - `admin` - Role-gated management dashboard
//!
//! # Architecture
//!
//! The backend owns every entity described here. These types mirror its JSON
//! representation so the web binaries can render them and send user intent
//! back. Values derived here (effective prices, subtotals, badges) are for
//! display only; the backend's numbers are authoritative.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`entities`] - Backend entities (users, catalogue, cart, orders, coupons)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod entities;
pub mod types;

pub use entities::*;
pub use types::*;
