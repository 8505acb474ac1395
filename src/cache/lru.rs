//! Fixed-capacity least-recently-used map.
//!
//! Every `get` and `put` touches the entry. When an insert would exceed
//! the capacity, exactly the least recently touched entry is evicted.
//!
//! Recency is tracked with a monotonically increasing tick: `entries`
//! maps key to `(value, tick)` and `order` maps tick back to key, so the
//! oldest entry is always `order`'s first element.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Bounded LRU map. Not synchronized; callers wrap it in a lock.
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
    capacity: usize,
    tick: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            capacity: capacity.max(1),
            tick: 0,
        }
    }

    /// Look up a key and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let next = self.next_tick();
        let (_, tick) = self.entries.get_mut(key)?;
        let old = std::mem::replace(tick, next);
        if let Some(k) = self.order.remove(&old) {
            self.order.insert(next, k);
        }
        self.entries.get(key).map(|(v, _)| v)
    }

    /// Look up a key without changing its recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(v, _)| v)
    }

    /// Insert or replace a value, marking it most recently used.
    ///
    /// Returns the evicted `(key, value)` if the insert pushed the cache
    /// over capacity.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        let tick = self.next_tick();
        if let Some((_, old_tick)) = self.entries.insert(key.clone(), (value, tick)) {
            self.order.remove(&old_tick);
        }
        self.order.insert(tick, key);

        if self.entries.len() > self.capacity {
            let (_, oldest) = self.order.pop_first()?;
            return self
                .entries
                .remove(&oldest)
                .map(|(value, _)| (oldest, value));
        }
        None
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (value, tick) = self.entries.remove(key)?;
        self.order.remove(&tick);
        Some(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}
