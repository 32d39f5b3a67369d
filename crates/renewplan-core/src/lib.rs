//! Client library for the renewal plan recommendation service.
//!
//! Admins drill down a B1 → B2 → B3 hierarchy imported from spreadsheets and
//! override the frequency-derived percentages at each level. This crate
//! provides:
//!
//! - `api`: typed REST client with bearer auth and cache-aware reads
//! - `cache`: TTL response cache with prefix invalidation
//! - `percentage`: local edit buffers that keep sibling sets summing to 100
//! - `auth`: the session/identity service and keychain credential store
//! - `config`: persisted user configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod percentage;

pub use api::{ApiClient, ApiError};
pub use auth::Session;
pub use cache::ResponseCache;
pub use config::Config;
pub use percentage::{BalancingMode, PercentageEditor, Selection};
