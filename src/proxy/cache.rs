use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Thread-safe response cache keyed by the fully-rewritten target URL.
///
/// Keys are matched exactly: two URLs differing only in encoding, case or
/// query-parameter order are distinct entries. Entries expire after `ttl`
/// and the map never holds more than `capacity` live entries.
pub struct ResponseCache {
    entries: DashMap<String, CacheSlot>,
    ttl: Duration,
    capacity: usize,
}

struct CacheSlot {
    value: Value,
    inserted_at: Instant,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, url: &str) -> Option<Value> {
        let expired = match self.entries.get(url) {
            Some(slot) if slot.inserted_at.elapsed() > self.ttl => true,
            Some(slot) => return Some(slot.value.clone()),
            None => return None,
        };
        if expired {
            self.entries.remove(url);
        }
        None
    }

    pub fn insert(&self, url: String, value: Value) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&url) {
            self.evict_one();
        }
        self.entries.insert(
            url,
            CacheSlot {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops expired entries first; falls back to the oldest live entry.
    fn evict_one(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, slot| slot.inserted_at.elapsed() <= ttl);
        if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().inserted_at)
                .map(|entry| entry.key().clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hit_and_miss() {
        let cache = ResponseCache::new(Duration::from_secs(60), 16);
        assert!(cache.get("https://example.com/a").is_none());

        cache.insert("https://example.com/a".to_string(), json!({"n": 1}));
        assert_eq!(cache.get("https://example.com/a"), Some(json!({"n": 1})));

        // Exact-string matching: a different query is a different key.
        assert!(cache.get("https://example.com/a?x=1").is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = ResponseCache::new(Duration::from_millis(1), 16);
        cache.insert("https://example.com/a".to_string(), json!(1));

        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("https://example.com/a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.insert("a".to_string(), json!(1));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".to_string(), json!(2));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c".to_string(), json!(3));

        assert_eq!(cache.len(), 2);
        // The oldest entry was evicted; the newest survives.
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.insert("a".to_string(), json!(1));
        cache.insert("b".to_string(), json!(2));
        cache.insert("a".to_string(), json!(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(json!(3)));
        assert_eq!(cache.get("b"), Some(json!(2)));
    }
}
