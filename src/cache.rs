//! Size- and time-bounded in-memory cache for upstream payloads.

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Slot<V> {
    value: V,
    stored_at: Instant,
    touched: u64,
}

/// String-keyed cache bounded by entry count and entry age.
///
/// Entries expire `ttl` after insertion and are purged lazily when read past
/// their deadline; a stale value is never returned. When an insert pushes the
/// cache past `capacity`, the least-recently-used entry is evicted. Recency is
/// tracked with a monotonic touch counter bumped on hits and inserts, so reads
/// keep hot entries alive.
pub struct BoundedCache<V> {
    capacity: usize,
    ttl: Duration,
    tick: u64,
    slots: HashMap<String, Slot<V>>,
}

impl<V: Clone> BoundedCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            tick: 0,
            slots: HashMap::new(),
        }
    }

    /// Returns a clone of the live value for `key`, refreshing its recency.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Stores `value` under `key`, fully replacing any previous entry.
    pub fn set(&mut self, key: String, value: V) {
        self.set_at(key, value, Instant::now())
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.slots.get(key) {
            None => return None,
            Some(slot) => now.duration_since(slot.stored_at) > self.ttl,
        };
        if expired {
            self.slots.remove(key);
            return None;
        }
        self.tick += 1;
        let slot = self.slots.get_mut(key)?;
        slot.touched = self.tick;
        Some(slot.value.clone())
    }

    fn set_at(&mut self, key: String, value: V, now: Instant) {
        self.tick += 1;
        self.slots.insert(
            key,
            Slot {
                value,
                stored_at: now,
                touched: self.tick,
            },
        );
        if self.slots.len() > self.capacity {
            self.evict_least_recent();
        }
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .slots
            .iter()
            .min_by_key(|(_, slot)| slot.touched)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.slots.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[test]
    fn returns_stored_value_until_ttl() {
        let mut cache = BoundedCache::new(5, TTL);
        let t0 = Instant::now();

        cache.set_at("a".to_string(), 1, t0);
        assert_eq!(cache.get_at("a", t0), Some(1));
        assert_eq!(cache.get_at("a", t0 + TTL), Some(1), "entry at exactly ttl is still live");
        assert_eq!(cache.get_at("a", t0 + TTL + Duration::from_millis(1)), None);
        // The expired entry was purged, not just hidden.
        assert_eq!(cache.get_at("a", t0), None);
    }

    #[test]
    fn missing_key_is_none() {
        let mut cache: BoundedCache<u32> = BoundedCache::new(5, TTL);
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut cache = BoundedCache::new(5, TTL);
        let t0 = Instant::now();

        cache.set_at("a".to_string(), 1, t0);
        cache.set_at("a".to_string(), 2, t0 + Duration::from_secs(1));
        assert_eq!(cache.get_at("a", t0 + Duration::from_secs(2)), Some(2));
        // Replacing also restarts the ttl clock.
        assert_eq!(cache.get_at("a", t0 + TTL + Duration::from_millis(500)), Some(2));
    }

    #[test]
    fn evicts_least_recently_used_past_capacity() {
        let mut cache = BoundedCache::new(2, TTL);
        let t0 = Instant::now();

        cache.set_at("a".to_string(), 1, t0);
        cache.set_at("b".to_string(), 2, t0);
        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get_at("a", t0), Some(1));

        cache.set_at("c".to_string(), 3, t0);
        assert_eq!(cache.get_at("a", t0), Some(1));
        assert_eq!(cache.get_at("b", t0), None, "lru entry should have been evicted");
        assert_eq!(cache.get_at("c", t0), Some(3));
    }

    #[test]
    fn replacing_at_capacity_does_not_evict() {
        let mut cache = BoundedCache::new(2, TTL);
        let t0 = Instant::now();

        cache.set_at("a".to_string(), 1, t0);
        cache.set_at("b".to_string(), 2, t0);
        cache.set_at("a".to_string(), 10, t0);

        assert_eq!(cache.get_at("a", t0), Some(10));
        assert_eq!(cache.get_at("b", t0), Some(2));
    }

    #[test]
    fn expired_entries_lose_to_fresh_inserts() {
        let mut cache = BoundedCache::new(5, TTL);
        let t0 = Instant::now();

        cache.set_at("a".to_string(), 1, t0);
        let later = t0 + TTL + Duration::from_secs(1);
        assert_eq!(cache.get_at("a", later), None);

        cache.set_at("a".to_string(), 2, later);
        assert_eq!(cache.get_at("a", later), Some(2));
    }
}
