//! # Bounded, concurrency-safe LRU index.
//!
//! [`LruIndex`] maps ids to shared records and retains at most
//! `capacity` entries. `get` promotes, `add` evicts the
//! least-recently-accessed entry when a new key would exceed capacity.
//!
//! Values are held as `Arc`, and eviction drops only the index's
//! reference: tasks already holding a record keep it alive and fully
//! operable, only lookups through the index fail afterwards. Evicting
//! a record never stops its job.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

struct IndexEntry<V> {
    value: Arc<V>,
    /// Monotonic recency stamp; larger means more recently accessed.
    touched: AtomicU64,
}

/// Fixed-capacity map with least-recently-accessed eviction.
pub(crate) struct LruIndex<K, V>
where
    K: Eq + Hash + Clone,
{
    entries: DashMap<K, IndexEntry<V>>,
    capacity: usize,
    clock: AtomicU64,
    /// Serializes admissions: the capacity check, the eviction, and the
    /// insert in `add` must be observed as a single step, or concurrent
    /// adds can race past capacity. Lookups and iteration go straight
    /// to the map.
    admit: Mutex<()>,
}

impl<K, V> LruIndex<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            clock: AtomicU64::new(0),
            admit: Mutex::new(()),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Inserts or replaces `value` under `key`, evicting the
    /// least-recently-accessed entry first when a new key would push
    /// the index past capacity.
    pub(crate) fn add(&self, key: K, value: Arc<V>) {
        let _admit = self.admit.lock().unwrap_or_else(|e| e.into_inner());
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            IndexEntry {
                value,
                touched: AtomicU64::new(self.tick()),
            },
        );
    }

    /// Returns the record under `key`, promoting it to most recently
    /// accessed.
    pub(crate) fn get(&self, key: &K) -> Option<Arc<V>> {
        let entry = self.entries.get(key)?;
        entry.touched.store(self.tick(), Ordering::SeqCst);
        Some(entry.value.clone())
    }

    /// Visits every entry in unspecified order.
    pub(crate) fn each(&self, mut f: impl FnMut(&K, &Arc<V>)) {
        for entry in self.entries.iter() {
            f(entry.key(), &entry.value().value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_lru(&self) {
        let mut oldest: Option<(K, u64)> = None;
        for entry in self.entries.iter() {
            let touched = entry.touched.load(Ordering::SeqCst);
            match &oldest {
                Some((_, stamp)) if touched >= *stamp => {}
                _ => oldest = Some((entry.key().clone(), touched)),
            }
        }
        if let Some((key, _)) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(capacity: usize) -> LruIndex<&'static str, u32> {
        LruIndex::new(capacity)
    }

    #[test]
    fn add_then_get_round_trips() {
        let idx = index(4);
        idx.add("a", Arc::new(1));
        assert_eq!(idx.get(&"a").as_deref(), Some(&1));
        assert_eq!(idx.get(&"missing"), None);
    }

    #[test]
    fn exceeding_capacity_evicts_least_recently_accessed() {
        let idx = index(2);
        idx.add("a", Arc::new(1));
        idx.add("b", Arc::new(2));
        idx.add("c", Arc::new(3));

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get(&"a"), None);
        assert_eq!(idx.get(&"b").as_deref(), Some(&2));
        assert_eq!(idx.get(&"c").as_deref(), Some(&3));
    }

    #[test]
    fn get_promotes_against_eviction() {
        let idx = index(2);
        idx.add("a", Arc::new(1));
        idx.add("b", Arc::new(2));

        // Touch "a" so "b" becomes the eviction candidate.
        idx.get(&"a");
        idx.add("c", Arc::new(3));

        assert_eq!(idx.get(&"a").as_deref(), Some(&1));
        assert_eq!(idx.get(&"b"), None);
        assert_eq!(idx.get(&"c").as_deref(), Some(&3));
    }

    #[test]
    fn readding_an_existing_key_does_not_evict() {
        let idx = index(2);
        idx.add("a", Arc::new(1));
        idx.add("b", Arc::new(2));
        idx.add("a", Arc::new(10));

        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get(&"a").as_deref(), Some(&10));
        assert_eq!(idx.get(&"b").as_deref(), Some(&2));
    }

    #[test]
    fn each_visits_every_entry_once() {
        let idx = index(8);
        idx.add("a", Arc::new(1));
        idx.add("b", Arc::new(2));
        idx.add("c", Arc::new(3));

        let mut seen = Vec::new();
        idx.each(|k, v| seen.push((*k, **v)));
        seen.sort();
        assert_eq!(seen, vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn concurrent_adds_never_grow_past_capacity() {
        let idx = Arc::new(LruIndex::<u32, u32>::new(4));

        let mut workers = Vec::new();
        for t in 0..4u32 {
            let idx = idx.clone();
            workers.push(std::thread::spawn(move || {
                for i in 0..100 {
                    idx.add(t * 1000 + i, Arc::new(i));
                }
            }));
        }
        for w in workers {
            w.join().unwrap();
        }

        assert!(idx.len() <= 4, "index grew to {}", idx.len());
    }

    #[test]
    fn evicted_values_survive_through_existing_arcs() {
        let idx = index(1);
        let held = Arc::new(7);
        idx.add("a", held.clone());
        idx.add("b", Arc::new(8));

        assert_eq!(idx.get(&"a"), None);
        // The caller's Arc is unaffected by eviction.
        assert_eq!(*held, 7);
    }
}
