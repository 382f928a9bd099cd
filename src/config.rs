use crate::hash::ShardHasher;

/// Shard count used when none is requested.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Upper bound on the number of shards a map can have.
pub const MAX_SHARD_COUNT: usize = 1 << 16;

/// Round a requested shard count up to a power of two in `[1, MAX_SHARD_COUNT]`.
///
/// Out-of-range requests are clamped rather than rejected, so `0` and
/// negative values give a single shard.
///
/// ```rust
/// use stringshard::config::effective_shard_count;
///
/// assert_eq!(effective_shard_count(100), 128);
/// assert_eq!(effective_shard_count(-3), 1);
/// assert_eq!(effective_shard_count(1_000_000), 65536);
/// ```
pub fn effective_shard_count(requested: isize) -> usize {
    if requested < 1 {
        return 1;
    }
    let requested = requested as usize;
    if requested >= MAX_SHARD_COUNT {
        return MAX_SHARD_COUNT;
    }
    requested.next_power_of_two()
}

/// Which hash function to use for shard assignment.
///
/// Every variant is seeded with fresh randomness per map instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// Use ahash (default, fast and well-distributed).
    #[default]
    AHash,
    /// Use fxhash with a random prefix seed (faster, weaker mixing).
    #[cfg(feature = "fxhash")]
    FxHash,
}

/// Configuration for a ShardedMap instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) requested_shards: isize,
    pub(crate) hash_function: HashFunction,
    pub(crate) capacity_per_shard: Option<usize>,
}

impl Config {
    /// Create a new config with defaults (32 shards, ahash).
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a number of shards. The value is rounded up to a power of two
    /// and clamped to `[1, 65536]` when the map is built.
    pub fn shard_count(mut self, count: isize) -> Self {
        self.requested_shards = count;
        self
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.hash_function = hash_fn;
        self
    }

    /// Set initial capacity per shard. Total capacity will be approximately
    /// `capacity_per_shard * shard_count`. Omitted by default.
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.capacity_per_shard = Some(capacity);
        self
    }

    /// The shard count a map built from this config will actually have.
    pub fn effective_shard_count(&self) -> usize {
        effective_shard_count(self.requested_shards)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            requested_shards: DEFAULT_SHARD_COUNT as isize,
            hash_function: HashFunction::AHash,
            capacity_per_shard: None,
        }
    }
}

/// Builder for creating a ShardedMap with custom configuration.
#[derive(Debug, Default)]
pub struct ShardMapBuilder {
    config: Config,
}

impl ShardMapBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Request a number of shards (rounded up to a power of two, clamped).
    pub fn shard_count(mut self, count: isize) -> Self {
        self.config = self.config.shard_count(count);
        self
    }

    /// Set the hash function to use.
    pub fn hash_function(mut self, hash_fn: HashFunction) -> Self {
        self.config = self.config.hash_function(hash_fn);
        self
    }

    /// Set initial capacity per shard. Total capacity ≈ `capacity_per_shard * shard_count`.
    pub fn capacity_per_shard(mut self, capacity: usize) -> Self {
        self.config = self.config.capacity_per_shard(capacity);
        self
    }

    /// Build a ShardedMap with the configured settings.
    pub fn build<V>(self) -> crate::ShardedMap<V>
    where
        V: Send + Sync,
    {
        crate::ShardedMap::with_config(self.config)
    }
}

/// Create a freshly seeded hasher for the configured hash function.
pub(crate) fn create_hasher(hash_fn: HashFunction) -> ShardHasher {
    match hash_fn {
        HashFunction::AHash => ShardHasher::ahash(),
        #[cfg(feature = "fxhash")]
        HashFunction::FxHash => ShardHasher::fxhash(),
    }
}
