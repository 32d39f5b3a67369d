//! In-memory response caching for the recommendation API.
//!
//! This module provides the `ResponseCache` that fronts idempotent reads
//! against the API. Entries expire after a per-entry TTL and are evicted
//! lazily on read. Mutations invalidate entries by key prefix.
//!
//! Key scheme (see `keys`):
//! - `b1Values`
//! - `b2Data:<B1>`
//! - `b3Data:<B1>:<B2>`
//! - `b3Details:<B1>:<B2>:<B3>`
//! - `phoneBrands`

pub mod clock;
pub mod keys;
pub mod manager;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::{CacheEntry, ResponseCache, TtlPolicy};
