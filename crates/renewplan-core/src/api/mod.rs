//! REST API client module for the renewal plan recommendation service.
//!
//! This module provides the `ApiClient` for browsing the B1 → B2 → B3
//! hierarchy, updating percentage overrides, importing spreadsheets and
//! managing phone brands.
//!
//! The API uses bearer token authentication obtained from `/auth/login`.
//! Reads are served from the injected `ResponseCache` when fresh.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_API_BASE_URL};
pub use error::ApiError;
