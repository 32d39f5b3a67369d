//! Data models for the renewal plan hierarchy.
//!
//! This module contains the wire and domain types exchanged with the
//! recommendation API:
//!
//! - `CategoryItem`, `DetailItem`: B1 → B2 → B3 hierarchy entries with percentages
//! - `Level`: which hierarchy level a sibling set belongs to
//! - `PhoneBrand`, `PhoneBrandDraft`: the supplementary phone brand list
//! - `User`, `Role`, `AuthResponse`: login results
//! - `ImportResponse`: spreadsheet import summary

pub mod category;
pub mod phone_brand;
pub mod user;

pub use category::{CategoryItem, DetailItem, ImportResponse, Level};
pub use phone_brand::{DraftError, PhoneBrand, PhoneBrandDraft};
pub use user::{AuthResponse, Role, User};
