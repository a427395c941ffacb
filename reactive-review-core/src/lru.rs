//! A small, single-threaded bounded LRU map shared by `ResponseCache`,
//! `PlanStore`, `HistoryStore`, and `ExecutionTracker`. Callers wrap it in
//! whatever synchronization their access pattern needs (a `std::sync::Mutex`
//! for the non-suspending cache, `DashMap`-sharded state elsewhere).
//!
//! Not a high-throughput LRU: eviction scans for the oldest logical tick.
//! Capacities here are in the hundreds to low thousands, so this is cheap
//! enough in practice and keeps the implementation easy to audit.

use std::collections::HashMap;
use std::hash::Hash;

struct Entry<V> {
    value: V,
    tick: u64,
}

pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, Entry<V>>,
    clock: u64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(key) {
            entry.tick = tick;
            Some(&self.entries[key].value)
        } else {
            None
        }
    }

    /// Inserts `key -> value`, evicting the least-recently-used entry if the
    /// map would otherwise exceed capacity. Returns the evicted key, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<K> {
        let tick = self.tick();
        self.entries.insert(key.clone(), Entry { value, tick });

        if self.entries.len() <= self.capacity {
            return None;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.tick)
            .map(|(k, _)| k.clone());
        if let Some(ref oldest_key) = oldest {
            if oldest_key != &key {
                self.entries.remove(oldest_key);
            }
        }
        oldest.filter(|k| k != &key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn retain(&mut self, mut f: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|k, e| f(k, &e.value));
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, e)| (k, &e.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut lru: LruCache<i32, &'static str> = LruCache::new(2);
        lru.put(1, "a");
        lru.put(2, "b");
        assert_eq!(lru.get(&1), Some(&"a")); // touch 1, 2 is now oldest
        lru.put(3, "c"); // evicts 2
        assert!(!lru.contains_key(&2));
        assert!(lru.contains_key(&1));
        assert!(lru.contains_key(&3));
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let mut lru: LruCache<i32, i32> = LruCache::new(0);
        lru.put(1, 10);
        lru.put(2, 20);
        assert_eq!(lru.len(), 1);
    }
}
