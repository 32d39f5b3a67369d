use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// Default TTL for percentage data, which admins edit frequently.
const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60);

/// The B1 value list only changes on spreadsheet import.
const B1_VALUES_TTL: Duration = Duration::from_secs(5 * 60);

/// Detail breakdowns are edited less often than summary percentages.
const DETAILS_TTL: Duration = Duration::from_secs(10 * 60);

/// TTLs per kind of read, by volatility of the data behind it.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
    pub default: Duration,
    pub b1_values: Duration,
    pub details: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            default: DEFAULT_TTL,
            b1_values: B1_VALUES_TTL,
            details: DETAILS_TTL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub data: Value,
    pub cached_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// An entry is valid while less than `ttl` has elapsed since it was stored.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (now - self.cached_at).to_std() {
            Ok(elapsed) => elapsed < self.ttl,
            // Clock went backwards: the entry cannot have aged yet
            Err(_) => true,
        }
    }
}

/// Process-wide, time-boxed store of API responses.
///
/// The cache is purely an optimization: it never returns an error. Anything
/// that cannot be stored or decoded is treated as a miss and the caller
/// fetches live.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: TtlPolicy,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), TtlPolicy::default())
    }

    pub fn with_clock(clock: Arc<dyn Clock>, ttl: TtlPolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave the map half-written
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached value for `key` if present and unexpired.
    /// An expired entry found here is evicted.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.entries();

        let entry = entries.get(key)?;
        if !entry.is_valid_at(now) {
            debug!(key = key, "Cache entry expired, evicting");
            entries.remove(key);
            return None;
        }

        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => {
                debug!(key = key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                debug!(key = key, error = %e, "Cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Store `value` under `key` with the default TTL.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.ttl.default);
    }

    /// Store `value` under `key`, replacing any previous entry wholesale.
    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(e) => {
                debug!(key = key, error = %e, "Value not cacheable, skipping");
                return;
            }
        };

        let entry = CacheEntry {
            key: key.to_string(),
            data,
            cached_at: self.clock.now(),
            ttl,
        };
        self.entries().insert(key.to_string(), entry);
    }

    /// Remove every entry whose key starts with `prefix`. Returns how many were removed.
    pub fn clear_by_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(prefix = prefix, removed = removed, "Invalidated cache entries");
        }
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        debug!(removed = entries.len(), "Clearing response cache");
        entries.clear();
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::keys;

    fn cache_with_clock() -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = ResponseCache::with_clock(clock.clone(), TtlPolicy::default());
        (cache, clock)
    }

    #[test]
    fn test_get_missing_key() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.get::<Vec<String>>("b1Values"), None);
    }

    #[test]
    fn test_b1_values_expire_after_ttl() {
        let (cache, clock) = cache_with_clock();
        let values = vec!["Premium".to_string(), "Basic".to_string()];

        cache.set_with_ttl(keys::B1_VALUES, &values, Duration::from_millis(300_000));
        assert_eq!(cache.get::<Vec<String>>(keys::B1_VALUES), Some(values.clone()));

        clock.advance_millis(299_999);
        assert_eq!(cache.get::<Vec<String>>(keys::B1_VALUES), Some(values));

        clock.advance_millis(2);
        assert_eq!(cache.get::<Vec<String>>(keys::B1_VALUES), None);
    }

    #[test]
    fn test_entry_expires_exactly_at_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", &1u32, Duration::from_millis(1000));
        clock.advance_millis(1000);
        assert_eq!(cache.get::<u32>("k"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_read() {
        let (cache, clock) = cache_with_clock();
        cache.set("phoneBrands", &vec![1, 2, 3]);
        assert_eq!(cache.len(), 1);

        clock.advance(chrono::Duration::minutes(3));
        // Still stored until something reads it
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get::<Vec<i32>>("phoneBrands"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_set_replaces_and_refreshes_timestamp() {
        let (cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", &"old", Duration::from_secs(60));
        clock.advance(chrono::Duration::seconds(50));
        cache.set_with_ttl("k", &"new", Duration::from_secs(60));
        clock.advance(chrono::Duration::seconds(50));
        assert_eq!(cache.get::<String>("k").as_deref(), Some("new"));
    }

    #[test]
    fn test_clear_by_prefix_scope() {
        let (cache, _) = cache_with_clock();
        cache.set("b2Data:X", &1);
        cache.set("b2Data:X:extra", &2);
        cache.set("b2Data:Y", &3);
        cache.set("b3Data:X", &4);

        assert_eq!(cache.clear_by_prefix("b2Data:X"), 2);
        assert_eq!(cache.get::<i32>("b2Data:X"), None);
        assert_eq!(cache.get::<i32>("b2Data:X:extra"), None);
        assert_eq!(cache.get::<i32>("b2Data:Y"), Some(3));
        assert_eq!(cache.get::<i32>("b3Data:X"), Some(4));
    }

    #[test]
    fn test_clear_removes_everything() {
        let (cache, _) = cache_with_clock();
        cache.set(keys::B1_VALUES, &vec!["A"]);
        cache.set(&keys::b2_data("A"), &Vec::<i32>::new());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_a_miss() {
        let (cache, _) = cache_with_clock();
        cache.set("k", &"not a number");
        assert_eq!(cache.get::<u64>("k"), None);
    }

    #[test]
    fn test_default_ttl_policy() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.b1_values, Duration::from_secs(300));
        assert_eq!(policy.default, Duration::from_secs(120));
        assert_eq!(policy.details, Duration::from_secs(600));
    }
}
