use crate::stats::{PruneStats, ShardStats};
use crate::PruneAction;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A single shard containing a HashMap protected by a read-write lock.
///
/// Every method takes the lock exactly once and releases it before
/// returning. Nothing here ever touches a second shard.
pub(crate) struct Shard<V> {
    map: RwLock<HashMap<String, V>>,
    stats: ShardStats,
}

impl<V> Shard<V>
where
    V: Send + Sync,
{
    pub fn new(capacity: Option<usize>) -> Self {
        let map = match capacity {
            Some(capacity) => HashMap::with_capacity(capacity),
            None => HashMap::new(),
        };
        Self {
            map: RwLock::new(map),
            stats: ShardStats::new(),
        }
    }

    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, V>> {
        #[cfg(feature = "lock-timing")]
        let start = std::time::Instant::now();
        let guard = self.map.read();
        #[cfg(feature = "lock-timing")]
        self.stats.record_lock_wait(start.elapsed().as_nanos() as u64);
        self.stats.record_lock_acquisition();
        guard
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, V>> {
        #[cfg(feature = "lock-timing")]
        let start = std::time::Instant::now();
        let guard = self.map.write();
        #[cfg(feature = "lock-timing")]
        self.stats.record_lock_wait(start.elapsed().as_nanos() as u64);
        self.stats.record_lock_acquisition();
        guard
    }

    /// Insert or overwrite, returning the previous value if any.
    pub fn set(&self, key: String, value: V) -> Option<V> {
        let mut map = self.write();
        self.stats.record_write();
        map.insert(key, value)
    }

    /// Insert only if the key is absent. Check and insert share one write
    /// critical section.
    pub fn set_if_absent(&self, key: String, value: V) -> (V, bool)
    where
        V: Clone,
    {
        let mut map = self.write();
        match map.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                self.stats.record_write();
                (entry.insert(value).clone(), true)
            }
        }
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let map = self.read();
        let result = map.get(key).cloned();
        if result.is_some() {
            self.stats.record_read();
        }
        result
    }

    /// Check if a key exists without cloning the value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Remove a key-value pair, returning the value if it existed.
    pub fn remove(&self, key: &str) -> Option<V> {
        let mut map = self.write();
        let result = map.remove(key);
        if result.is_some() {
            self.stats.record_removes(1);
        }
        result
    }

    /// Remove `key` if present and `predicate` accepts its value.
    ///
    /// The predicate runs while the write lock is held.
    pub fn remove_if<F>(&self, key: &str, predicate: F) -> bool
    where
        F: FnOnce(&V) -> bool,
    {
        let mut map = self.write();
        if !map.get(key).is_some_and(predicate) {
            return false;
        }
        map.remove(key);
        self.stats.record_removes(1);
        true
    }

    /// Mutate a value in place, returning a copy of the new value if the key existed.
    ///
    /// The closure runs while the write lock is held.
    pub fn update<F>(&self, key: &str, f: F) -> Option<V>
    where
        F: FnOnce(&mut V),
        V: Clone,
    {
        let mut map = self.write();
        let value = map.get_mut(key)?;
        f(value);
        self.stats.record_write();
        Some(value.clone())
    }

    /// Get the number of entries in this shard.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if this shard is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop every entry, releasing the old table's memory.
    pub fn clear(&self) -> usize {
        let mut map = self.write();
        let removed = std::mem::take(&mut *map).len();
        self.stats.record_removes(removed as u64);
        removed
    }

    /// Copy every entry out under the read lock.
    pub fn entries(&self) -> Vec<(String, V)>
    where
        V: Clone,
    {
        let map = self.read();
        map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Copy every entry into `out` under the read lock.
    pub fn copy_into(&self, out: &mut HashMap<String, V>)
    where
        V: Clone,
    {
        let map = self.read();
        out.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Push the keys whose entries satisfy `predicate` onto `out`.
    ///
    /// Holds only the read lock; nothing is removed.
    pub fn collect_keys<F>(&self, predicate: &mut F, out: &mut Vec<String>)
    where
        F: FnMut(&str, &V) -> bool,
    {
        let map = self.read();
        out.extend(
            map.iter()
                .filter(|(k, v)| predicate(k.as_str(), *v))
                .map(|(k, _)| k.clone()),
        );
    }

    /// Run `predicate` over the live entries under the write lock, deleting
    /// the ones it marks. The first error stops the pass; entries already
    /// deleted stay deleted.
    pub fn prune<F, E>(&self, predicate: &mut F) -> Result<PruneStats, (PruneStats, E)>
    where
        F: FnMut(&str, &V) -> Result<PruneAction, E>,
    {
        let mut counts = PruneStats::default();
        let mut failure = None;
        {
            let mut map = self.write();
            map.retain(|key, value| {
                if failure.is_some() {
                    return true;
                }
                match predicate(key.as_str(), &*value) {
                    Ok(PruneAction::Delete) => {
                        counts.deleted += 1;
                        false
                    }
                    Ok(PruneAction::Keep) => {
                        counts.retained += 1;
                        true
                    }
                    Err(err) => {
                        failure = Some(err);
                        true
                    }
                }
            });
        }
        self.stats.record_removes(counts.deleted as u64);
        match failure {
            Some(err) => Err((counts, err)),
            None => Ok(counts),
        }
    }

    /// Get a snapshot of statistics for this shard.
    pub fn stats(&self) -> crate::stats::ShardOps {
        self.stats.snapshot()
    }
}
