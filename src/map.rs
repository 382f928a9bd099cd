use crate::config::{create_hasher, Config};
use crate::error::{Error, PruneError};
use crate::hash::ShardHasher;
use crate::iter::ShardIter;
use crate::shard::Shard;
use crate::stats::{Diagnostics, PruneStats, ShardOps, Stats};

/// What a [`ShardedMap::prune`] predicate wants done with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneAction {
    /// Remove the entry.
    Delete,
    /// Leave the entry in place.
    Keep,
}

impl From<bool> for PruneAction {
    /// `true` means delete.
    fn from(delete: bool) -> Self {
        if delete {
            PruneAction::Delete
        } else {
            PruneAction::Keep
        }
    }
}

/// Concurrent string-keyed map split across independently locked shards.
///
/// Every key is routed to one shard by `seeded_hash(key) & (shard_count - 1)`.
/// Point operations lock only that shard. Whole-map operations (`len`,
/// `clear`, `range`, `prune`, ...) visit shards one after another, locking
/// and releasing each in turn; there is no global lock, so their results are
/// weakly consistent under concurrent writes.
///
/// Values are returned as owned clones, so nothing handed out by the map can
/// alias the stored copy. Store `Arc<T>` if cloning is expensive.
///
/// # Reentrancy
///
/// [`delete_if`](Self::delete_if), [`update`](Self::update) and
/// [`prune`](Self::prune) run caller code while holding a shard's write lock,
/// and [`collect_keys`](Self::collect_keys) while holding its read lock.
/// That code must not call back into the same map: a key that hashes to the
/// locked shard will deadlock. Collect what you need and act after the call
/// returns. [`range`](Self::range) and [`iter`](Self::iter) hold no lock while
/// the caller runs and are safe to mutate from.
///
/// # Example
///
/// ```rust
/// use stringshard::ShardedMap;
///
/// let map = ShardedMap::new();
/// map.set("key1", "value1");
///
/// assert_eq!(map.get("key1"), Some("value1"));
/// assert_eq!(map.get_or("missing", "fallback"), ("fallback", false));
/// ```
pub struct ShardedMap<V> {
    shards: Box<[Shard<V>]>,
    shard_mask: usize,
    hash: ShardHasher,
}

impl<V> ShardedMap<V>
where
    V: Send + Sync,
{
    /// Create a new map with defaults (32 shards, ahash).
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a map with roughly `shard_count` shards.
    ///
    /// The count is rounded up to a power of two and clamped to `[1, 65536]`.
    ///
    /// ```rust
    /// use stringshard::ShardedMap;
    ///
    /// let map: ShardedMap<u32> = ShardedMap::with_shards(100);
    /// assert_eq!(map.shard_count(), 128);
    /// ```
    pub fn with_shards(shard_count: isize) -> Self {
        Self::with_config(Config::default().shard_count(shard_count))
    }

    /// Create a new map with custom config.
    pub fn with_config(config: Config) -> Self {
        let shard_count = config.effective_shard_count();
        tracing::debug!(
            requested = config.requested_shards,
            shard_count,
            hash_function = ?config.hash_function,
            "building sharded map"
        );

        let shards: Box<[Shard<V>]> = (0..shard_count)
            .map(|_| Shard::new(config.capacity_per_shard))
            .collect();

        Self {
            shards,
            shard_mask: shard_count - 1,
            hash: create_hasher(config.hash_function),
        }
    }

    /// Figure out which shard this key belongs to.
    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        (self.hash.hash_key(key) as usize) & self.shard_mask
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    /// Number of shards (after rounding and clamping).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard `key` routes to. Stable for the lifetime of this map,
    /// but differs between map instances.
    pub fn shard_of(&self, key: &str) -> usize {
        self.shard_index(key)
    }

    /// Insert or overwrite a value.
    ///
    /// Returns the value previously stored under `key`, if any.
    pub fn set(&self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        self.shard(&key).set(key, value)
    }

    /// Insert `value` only if `key` is absent.
    ///
    /// Returns the value now stored under `key` and whether this call inserted
    /// it. The check and the insert happen under one write lock, so exactly
    /// one of several racing callers sees `true`.
    ///
    /// ```rust
    /// use stringshard::ShardedMap;
    ///
    /// let map = ShardedMap::new();
    /// assert_eq!(map.set_if_absent("k", 1), (1, true));
    /// assert_eq!(map.set_if_absent("k", 2), (1, false));
    /// ```
    pub fn set_if_absent(&self, key: impl Into<String>, value: V) -> (V, bool)
    where
        V: Clone,
    {
        let key = key.into();
        self.shard(&key).set_if_absent(key, value)
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        self.shard(key).get(key)
    }

    /// Get the value under `key`, or `fallback` if absent.
    ///
    /// The boolean reports whether the key was found. The fallback is never
    /// written into the map.
    pub fn get_or(&self, key: &str, fallback: V) -> (V, bool)
    where
        V: Clone,
    {
        match self.get(key) {
            Some(value) => (value, true),
            None => (fallback, false),
        }
    }

    /// Check whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.shard(key).contains_key(key)
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.shard(key).remove(key)
    }

    /// Remove `key`. Returns whether an entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    /// Remove `key` if it is present and `predicate` holds for its value.
    ///
    /// `predicate` runs under the shard's write lock and must not touch this
    /// map (see [Reentrancy](Self#reentrancy)).
    ///
    /// ```rust
    /// use stringshard::ShardedMap;
    ///
    /// let map = ShardedMap::new();
    /// map.set("session", 3);
    /// assert!(!map.delete_if("session", |ttl| *ttl == 0));
    /// assert!(map.delete_if("session", |ttl| *ttl == 3));
    /// assert!(map.get("session").is_none());
    /// ```
    pub fn delete_if<F>(&self, key: &str, predicate: F) -> bool
    where
        F: FnOnce(&V) -> bool,
    {
        self.shard(key).remove_if(key, predicate)
    }

    /// Mutate a value in place, returning a copy of the result if the key existed.
    ///
    /// `f` runs under the shard's write lock and must not touch this map.
    ///
    /// ```rust
    /// use stringshard::ShardedMap;
    ///
    /// let map = ShardedMap::new();
    /// map.set("counter", 0);
    /// map.update("counter", |v| *v += 1);
    /// assert_eq!(map.get("counter"), Some(1));
    /// ```
    pub fn update<F>(&self, key: &str, f: F) -> Option<V>
    where
        F: FnOnce(&mut V),
        V: Clone,
    {
        self.shard(key).update(key, f)
    }

    /// Get the total number of entries across all shards.
    ///
    /// Each shard is counted under its own read lock, one after another. Under
    /// concurrent inserts or deletes the sum may not match any single instant.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    /// Check if the map is empty. Weakly consistent, like [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }

    /// Entry count of each shard, in shard order. Intended for checking load
    /// distribution.
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.shards.iter().map(|shard| shard.len()).collect()
    }

    /// Remove every entry, one shard at a time.
    ///
    /// Not atomic: writers racing with `clear` may land in shards that have
    /// already been emptied.
    pub fn clear(&self) {
        let removed: usize = self.shards.iter().map(|shard| shard.clear()).sum();
        tracing::debug!(removed, shards = self.shards.len(), "cleared sharded map");
    }

    /// Visit entries shard by shard until `visitor` returns `false`.
    ///
    /// Each shard is copied under its read lock and the lock is released before
    /// `visitor` sees any of its entries, so `visitor` may read or write this
    /// map. Returning `false` stops the whole traversal, including shards not
    /// yet visited; the map itself is unaffected.
    ///
    /// ```rust
    /// use stringshard::ShardedMap;
    ///
    /// let map = ShardedMap::new();
    /// for i in 0..10 {
    ///     map.set(format!("k{}", i), i);
    /// }
    ///
    /// let mut seen = 0;
    /// map.range(|_key, _value| {
    ///     seen += 1;
    ///     seen < 3
    /// });
    /// assert_eq!(seen, 3);
    /// ```
    pub fn range<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &V) -> bool,
        V: Clone,
    {
        for (key, value) in self.iter() {
            if !visitor(&key, &value) {
                return;
            }
        }
    }

    /// Iterate over copies of all entries, one shard at a time.
    ///
    /// Same consistency as [`range`](Self::range): no lock is held between
    /// items.
    pub fn iter(&self) -> ShardIter<'_, V>
    where
        V: Clone,
    {
        ShardIter::new(&self.shards)
    }

    /// Copy the contents of a single shard.
    pub fn shard_snapshot(&self, index: usize) -> Result<hashbrown::HashMap<String, V>, Error>
    where
        V: Clone,
    {
        let shard = self.shards.get(index).ok_or(Error::ShardOutOfRange {
            index,
            shard_count: self.shards.len(),
        })?;
        let mut out = hashbrown::HashMap::new();
        shard.copy_into(&mut out);
        Ok(out)
    }

    /// Copy every entry into one map. Shards are copied one after another, so
    /// this is weakly consistent under concurrent writes.
    pub fn snapshot(&self) -> hashbrown::HashMap<String, V>
    where
        V: Clone,
    {
        let mut out = hashbrown::HashMap::new();
        for shard in self.shards.iter() {
            shard.copy_into(&mut out);
        }
        out
    }

    /// Keys of every entry for which `predicate` returns `true`.
    ///
    /// Takes only read locks and removes nothing. This is the safe way to do
    /// conditional bulk deletion: collect, then [`delete`](Self::delete) or
    /// [`delete_if`](Self::delete_if) the keys after this returns. `predicate`
    /// runs under a shard's read lock and must not write to this map.
    ///
    /// ```rust
    /// use stringshard::ShardedMap;
    ///
    /// let map = ShardedMap::new();
    /// map.set("a", 1);
    /// map.set("b", 20);
    ///
    /// for key in map.collect_keys(|_, v| *v < 10) {
    ///     map.delete(&key);
    /// }
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn collect_keys<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str, &V) -> bool,
    {
        let mut keys = Vec::new();
        for shard in self.shards.iter() {
            shard.collect_keys(&mut predicate, &mut keys);
        }
        keys
    }

    /// Delete entries in place, one shard at a time.
    ///
    /// For each shard the write lock is taken and `predicate` is called on every
    /// live entry: `Ok(PruneAction::Delete)` removes it, `Ok(PruneAction::Keep)`
    /// keeps it. An `Err` stops the pass immediately, leaving later entries and
    /// shards untouched, and is returned in a [`PruneError`] together with the
    /// counts so far. Deletions made before the error are not undone.
    ///
    /// `predicate` runs while holding a write lock and must not touch this map.
    /// Prefer [`collect_keys`](Self::collect_keys) unless the whole pass has to
    /// run under the locks.
    ///
    /// ```rust
    /// use stringshard::{PruneAction, ShardedMap};
    ///
    /// let map = ShardedMap::new();
    /// for (k, v) in [("a", 1), ("b", 5), ("c", 10), ("d", 15)] {
    ///     map.set(k, v);
    /// }
    ///
    /// let stats = map
    ///     .prune(|_, v| Ok::<_, std::convert::Infallible>(PruneAction::from(*v < 10)))
    ///     .unwrap();
    /// assert_eq!((stats.deleted, stats.retained), (2, 2));
    /// ```
    pub fn prune<F, E>(&self, mut predicate: F) -> Result<PruneStats, PruneError<E>>
    where
        F: FnMut(&str, &V) -> Result<PruneAction, E>,
    {
        let mut total = PruneStats::default();
        for (index, shard) in self.shards.iter().enumerate() {
            match shard.prune(&mut predicate) {
                Ok(counts) => {
                    tracing::trace!(
                        shard = index,
                        deleted = counts.deleted,
                        retained = counts.retained,
                        "pruned shard"
                    );
                    total += counts;
                }
                Err((counts, error)) => {
                    total += counts;
                    tracing::debug!(
                        shard = index,
                        deleted = total.deleted,
                        retained = total.retained,
                        "prune aborted by predicate error"
                    );
                    return Err(PruneError {
                        deleted: total.deleted,
                        retained: total.retained,
                        error,
                    });
                }
            }
        }
        Ok(total)
    }

    /// Get detailed statistics about the map and its shards.
    pub fn stats(&self) -> Stats {
        let shard_sizes = self.shard_sizes();
        let operations: Vec<ShardOps> = self.shards.iter().map(|s| s.stats()).collect();
        let size: usize = shard_sizes.iter().sum();

        Stats {
            size,
            shard_sizes,
            operations,
        }
    }

    /// Load-distribution and lock diagnostics derived from [`stats`](Self::stats).
    pub fn diagnostics(&self) -> Diagnostics {
        self.stats().diagnostics()
    }
}

impl<V> Default for ShardedMap<V>
where
    V: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for ShardedMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedMap")
            .field("shard_count", &self.shards.len())
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl<'a, V> IntoIterator for &'a ShardedMap<V>
where
    V: Clone + Send + Sync,
{
    type Item = (String, V);
    type IntoIter = ShardIter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
