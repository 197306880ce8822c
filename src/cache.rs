//! Fixed-capacity map with least-recently-used eviction.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// An unordered map bounded to a fixed capacity. Reads and writes both
/// refresh an entry; once the bound is exceeded the least recently used
/// entry is dropped.
pub struct UnorderedLruCache<K, V> {
    map: HashMap<K, V>,
    usage: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> UnorderedLruCache<K, V> {
    /// Creates a cache bounded to `capacity` entries. A zero capacity is
    /// a programming error.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        UnorderedLruCache {
            map: HashMap::with_capacity(capacity + 1),
            usage: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Looks up `key`, marking it most recently used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }
        self.map.get(key)
    }

    /// Inserts or replaces `key`, evicting the least recently used entry
    /// if the bound is exceeded.
    pub fn insert(&mut self, key: K, value: V) {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
        } else {
            self.usage.push_back(key);
        }
        self.truncate_if_needed();
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.usage.clear();
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.usage.iter().position(|k| k == key) {
            self.usage.remove(pos);
        }
        self.usage.push_back(key.clone());
    }

    fn truncate_if_needed(&mut self) {
        while self.map.len() > self.capacity {
            if let Some(oldest) = self.usage.pop_front() {
                self.map.remove(&oldest);
            } else {
                break;
            }
        }
    }
}
