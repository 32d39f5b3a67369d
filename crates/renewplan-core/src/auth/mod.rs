//! Authentication module for the admin session.
//!
//! This module provides:
//! - `Session`: the identity service holding the bearer token and user,
//!   optionally persisted to disk, with unauthorized callbacks
//! - `CredentialStore`: optional OS keychain storage of the admin password

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
