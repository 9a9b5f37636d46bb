pub mod invalidation;
pub mod keys;

pub use invalidation::Mutation;
pub use keys::{KeyPattern, QueryKey};

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

/// Last known server responses, keyed by [`QueryKey`].
///
/// Entries are never dropped by invalidation, only marked stale, so a
/// failed re-fetch still leaves the previous value readable via [`peek`].
///
/// [`peek`]: QueryCache::peek
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Value for `key` unless it is missing or stale.
    pub fn fresh(&self, key: &QueryKey) -> Option<serde_json::Value> {
        self.lock()
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| entry.value.clone())
    }

    pub fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    pub fn store(&self, key: QueryKey, value: serde_json::Value) {
        self.lock().insert(
            key,
            CacheEntry {
                value,
                fetched_at: Utc::now(),
                stale: false,
            },
        );
    }

    /// Marks every entry matching `pattern` stale. Returns how many entries
    /// matched.
    pub fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut entries = self.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if pattern.matches(key) {
                entry.stale = true;
                count += 1;
            }
        }
        debug!("Invalidated {} ({} entries)", pattern, count);
        count
    }

    pub fn invalidate_all(&self, patterns: &[KeyPattern]) -> usize {
        patterns.iter().map(|p| self.invalidate(p)).sum()
    }

    pub fn stale_keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .lock()
            .iter()
            .filter(|(_, entry)| entry.stale)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fresh_hides_stale_entries() {
        let cache = QueryCache::new();
        cache.store(keys::albums(), json!([1, 2]));
        assert_eq!(cache.fresh(&keys::albums()), Some(json!([1, 2])));

        assert_eq!(cache.invalidate(&KeyPattern::Exact(keys::albums())), 1);
        assert!(cache.fresh(&keys::albums()).is_none());

        let entry = cache.peek(&keys::albums()).unwrap();
        assert!(entry.stale);
        assert_eq!(entry.value, json!([1, 2]));
    }

    #[test]
    fn test_invalidate_twice_same_as_once() {
        let cache = QueryCache::new();
        cache.store(keys::albums(), json!([]));
        cache.store(keys::album("a1"), json!({}));

        let pattern = KeyPattern::Exact(keys::albums());
        cache.invalidate(&pattern);
        let once = cache.stale_keys();
        cache.invalidate(&pattern);
        assert_eq!(cache.stale_keys(), once);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_store_refreshes_stale_entry() {
        let cache = QueryCache::new();
        cache.store(keys::user_me(), json!({"name": "old"}));
        cache.invalidate(&KeyPattern::Exact(keys::user_me()));
        cache.store(keys::user_me(), json!({"name": "new"}));

        assert_eq!(cache.fresh(&keys::user_me()), Some(json!({"name": "new"})));
        assert!(cache.stale_keys().is_empty());
    }

    #[test]
    fn test_invalidate_unknown_key_is_noop() {
        let cache = QueryCache::new();
        assert_eq!(cache.invalidate(&KeyPattern::Prefix(keys::album_photos("zz"))), 0);
        assert!(cache.is_empty());
    }
}
