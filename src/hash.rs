#[cfg(feature = "fxhash")]
use std::hash::{Hash, Hasher};

/// Seeded hash function for shard assignment.
///
/// Each instance carries its own random seed, so two maps place the same key
/// set differently and crafted keys cannot target one shard across instances.
/// Hashing is a pure function of the seed and the key; no scratch state is
/// shared between calls.
pub enum ShardHasher {
    /// AHash keyed by a per-instance random state.
    AHash(ahash::RandomState),
    /// FxHash with a random seed written ahead of the key.
    #[cfg(feature = "fxhash")]
    FxHash(u64),
}

impl ShardHasher {
    /// AHash with fresh random keys.
    pub fn ahash() -> Self {
        ShardHasher::AHash(ahash::RandomState::new())
    }

    /// FxHash with a fresh random seed, drawn from ahash's runtime randomness.
    #[cfg(feature = "fxhash")]
    pub fn fxhash() -> Self {
        ShardHasher::FxHash(ahash::RandomState::new().hash_one(0u64))
    }

    /// Hash a key to determine which shard it belongs to.
    #[inline]
    pub fn hash_key(&self, key: &str) -> u64 {
        match self {
            ShardHasher::AHash(state) => state.hash_one(key),
            #[cfg(feature = "fxhash")]
            ShardHasher::FxHash(seed) => {
                let mut hasher = fxhash::FxHasher64::default();
                seed.hash(&mut hasher);
                key.hash(&mut hasher);
                hasher.finish()
            }
        }
    }
}

impl Default for ShardHasher {
    fn default() -> Self {
        ShardHasher::ahash()
    }
}

impl std::fmt::Debug for ShardHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Seeds stay out of debug output.
        match self {
            ShardHasher::AHash(_) => write!(f, "ShardHasher::AHash(..)"),
            #[cfg(feature = "fxhash")]
            ShardHasher::FxHash(_) => write!(f, "ShardHasher::FxHash(..)"),
        }
    }
}
