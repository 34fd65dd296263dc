//! TTL read-through cache for file reads
//!
//! Keys are `(file name, version selector)`; values are whatever the read
//! path wants to memoize. Entries expire after the configured TTL, and
//! every mutation of a name invalidates all of its keys.
//!
//! Invalidation also bumps a per-name generation. A read-through fill
//! captures the generation before it reads the ledger and passes it back
//! to [`CacheLayer::set`]; a fill that raced a mutation is silently
//! discarded, so the cache can never serve a version older than the last
//! committed one for that name.

use crate::core::ledger::VersionSelector;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use ahash::AHashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    selector: VersionSelector,
}

struct CacheSlot<V> {
    value: V,
    expires_at: Instant,
}

/// LRU cache with per-entry TTL and per-name invalidation
pub struct CacheLayer<V> {
    entries: Mutex<LruCache<CacheKey, CacheSlot<V>>>,
    generations: Mutex<AHashMap<String, u64>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> CacheLayer<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        CacheLayer {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            generations: Mutex::new(AHashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached value; expired entries count as misses and are
    /// dropped on the spot.
    pub fn get(&self, name: &str, selector: VersionSelector) -> Option<V> {
        let key = CacheKey {
            name: name.to_string(),
            selector,
        };
        let mut entries = self.entries.lock();
        let expired = match entries.get(&key) {
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(slot) => {
                if slot.expires_at > Instant::now() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(slot.value.clone());
                }
                true
            }
        };
        if expired {
            entries.pop(&key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Generation token for a name, captured before a read-through fill.
    pub fn read_token(&self, name: &str) -> u64 {
        *self.generations.lock().get(name).unwrap_or(&0)
    }

    /// Store a fill made under `token`. Returns `false` (and stores
    /// nothing) when the name was invalidated after the token was taken.
    pub fn set(&self, name: &str, selector: VersionSelector, value: V, token: u64) -> bool {
        {
            let generations = self.generations.lock();
            if *generations.get(name).unwrap_or(&0) != token {
                return false;
            }
            let mut entries = self.entries.lock();
            entries.put(
                CacheKey {
                    name: name.to_string(),
                    selector,
                },
                CacheSlot {
                    value,
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        true
    }

    /// Drop every entry for a name and bump its generation. Returns the
    /// number of entries removed.
    pub fn invalidate(&self, name: &str) -> usize {
        let mut generations = self.generations.lock();
        *generations.entry(name.to_string()).or_insert(0) += 1;
        let mut entries = self.entries.lock();
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    /// Cache hits observed so far.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Cache misses observed so far.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Live entry count (expired entries linger until touched).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().len() == 0
    }

    /// Test-reset hook: drops entries, generations, and counters.
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.generations.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> CacheLayer<String> {
        CacheLayer::new(16, Duration::from_secs(600))
    }

    #[test]
    fn test_set_then_get() {
        let cache = cache();
        let token = cache.read_token("a.txt");
        assert!(cache.set("a.txt", VersionSelector::Latest, "v1".into(), token));

        assert_eq!(
            cache.get("a.txt", VersionSelector::Latest),
            Some("v1".to_string())
        );
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_selectors_are_distinct_keys() {
        let cache = cache();
        let token = cache.read_token("a.txt");
        cache.set("a.txt", VersionSelector::Latest, "latest".into(), token);
        cache.set("a.txt", VersionSelector::Exact(1), "one".into(), token);

        assert_eq!(
            cache.get("a.txt", VersionSelector::Exact(1)),
            Some("one".to_string())
        );
        assert_eq!(
            cache.get("a.txt", VersionSelector::Latest),
            Some("latest".to_string())
        );
    }

    #[test]
    fn test_entries_expire() {
        let cache: CacheLayer<String> = CacheLayer::new(16, Duration::from_millis(30));
        let token = cache.read_token("a.txt");
        cache.set("a.txt", VersionSelector::Latest, "soon stale".into(), token);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("a.txt", VersionSelector::Latest), None);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_invalidate_removes_all_keys_for_name() {
        let cache = cache();
        let token_a = cache.read_token("a.txt");
        let token_b = cache.read_token("b.txt");
        cache.set("a.txt", VersionSelector::Latest, "a-latest".into(), token_a);
        cache.set("a.txt", VersionSelector::Exact(1), "a-one".into(), token_a);
        cache.set("b.txt", VersionSelector::Latest, "b-latest".into(), token_b);

        assert_eq!(cache.invalidate("a.txt"), 2);
        assert_eq!(cache.get("a.txt", VersionSelector::Latest), None);
        assert_eq!(cache.get("a.txt", VersionSelector::Exact(1)), None);
        assert_eq!(
            cache.get("b.txt", VersionSelector::Latest),
            Some("b-latest".to_string())
        );
    }

    #[test]
    fn test_stale_fill_is_discarded() {
        let cache = cache();
        let token = cache.read_token("a.txt");

        // A mutation lands between the token capture and the fill.
        cache.invalidate("a.txt");

        assert!(!cache.set("a.txt", VersionSelector::Latest, "stale".into(), token));
        assert_eq!(cache.get("a.txt", VersionSelector::Latest), None);
    }

    #[test]
    fn test_lru_eviction() {
        let cache: CacheLayer<String> = CacheLayer::new(2, Duration::from_secs(600));
        let t = cache.read_token("a");
        cache.set("a", VersionSelector::Latest, "a".into(), t);
        let t = cache.read_token("b");
        cache.set("b", VersionSelector::Latest, "b".into(), t);
        let t = cache.read_token("c");
        cache.set("c", VersionSelector::Latest, "c".into(), t);

        assert_eq!(cache.get("a", VersionSelector::Latest), None);
        assert_eq!(cache.get("c", VersionSelector::Latest), Some("c".to_string()));
    }
}
