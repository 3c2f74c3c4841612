use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Bounded key/value cache with time-to-idle expiry. Entries unused for
/// longer than the idle window are dropped on the next access; when full,
/// the least-recently-used entry is evicted. The interior lock is held
/// across `get_or_try_insert_with`'s build closure so at most one value is
/// ever constructed per key under concurrent first use.
pub struct TtiCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    capacity: usize,
    time_to_idle: Duration,
}

struct CacheEntry<V> {
    value: V,
    last_access: Instant,
}

impl<K: Eq + Hash + Clone, V: Clone> TtiCache<K, V> {
    pub fn new(capacity: usize, time_to_idle: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            time_to_idle,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::sweep(&mut entries, self.time_to_idle, now);
        entries.get_mut(key).map(|entry| {
            entry.last_access = now;
            entry.value.clone()
        })
    }

    /// Returns the cached value for `key`, building and caching it when
    /// absent. A failed build leaves the cache untouched.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        Self::sweep(&mut entries, self.time_to_idle, now);

        if let Some(entry) = entries.get_mut(&key) {
            entry.last_access = now;
            return Ok(entry.value.clone());
        }

        let value = build()?;
        if entries.len() >= self.capacity {
            Self::evict_idlest(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                last_access: now,
            },
        );
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn sweep(entries: &mut HashMap<K, CacheEntry<V>>, time_to_idle: Duration, now: Instant) {
        entries.retain(|_, entry| now.duration_since(entry.last_access) < time_to_idle);
    }

    fn evict_idlest(entries: &mut HashMap<K, CacheEntry<V>>) {
        let idlest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = idlest {
            entries.remove(&key);
        }
    }
}
