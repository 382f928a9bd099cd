//! # stringshard
//!
//! A concurrent, string-keyed map for many threads reading and writing at once.
//!
//! Keys are spread over a fixed table of shards, each guarded by its own
//! read-write lock. A key's shard is chosen by hashing it with a seed that is
//! random per map instance and masking the hash with `shard_count - 1`, so the
//! shard count is always a power of two. Operations on different shards never
//! contend.
//!
//! ## Features
//!
//! - **Point operations lock one shard**: `set`, `set_if_absent`, `get`,
//!   `delete`, `delete_if`, `update`
//! - **No global lock**: `len`, `clear`, `range`, `prune` walk shards one at a
//!   time and are weakly consistent under concurrent writes
//! - **Seeded hashing**: shard placement differs per instance, which blunts
//!   hash-flooding
//! - **Owned reads**: values come back as clones, never as references into a
//!   locked table
//! - **Diagnostics**: per-shard sizes, plus operation and lock counters behind
//!   the `metrics` / `lock-timing` features
//!
//! ## Example
//!
//! ```rust
//! use stringshard::{PruneAction, ShardedMap};
//!
//! let map = ShardedMap::with_shards(100);
//! assert_eq!(map.shard_count(), 128);
//!
//! map.set("a", 1);
//! map.set("b", 5);
//! map.set("c", 10);
//!
//! assert_eq!(map.get("a"), Some(1));
//! assert_eq!(map.set_if_absent("a", 99), (1, false));
//!
//! // Snapshot iteration: no lock is held while the closure runs.
//! map.range(|key, value| {
//!     println!("{}: {}", key, value);
//!     true
//! });
//!
//! // In-place conditional deletion.
//! let stats = map
//!     .prune(|_, v| Ok::<_, std::convert::Infallible>(PruneAction::from(*v < 10)))
//!     .unwrap();
//! assert_eq!(stats.deleted, 2);
//! assert_eq!(map.len(), 1);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use stringshard::{HashFunction, ShardMapBuilder};
//!
//! let map = ShardMapBuilder::new()
//!     .shard_count(64)
//!     .hash_function(HashFunction::AHash)
//!     .capacity_per_shard(128)
//!     .build::<u64>();
//! assert_eq!(map.shard_count(), 64);
//! ```
//!
//! ## Callbacks and locks
//!
//! `delete_if`, `update` and `prune` call user code while a shard's write lock
//! is held. Touching the same map from inside those callbacks can deadlock;
//! see [`ShardedMap`] for the rules.

#![deny(missing_docs)]
#![warn(clippy::all)]

/// Configuration and builder types.
pub mod config;
/// Error types.
pub mod error;
/// Seeded hashing for shard assignment.
pub mod hash;
/// Snapshot iterator.
pub mod iter;
/// Main ShardedMap implementation.
pub mod map;
/// Internal shard implementation.
mod shard;
/// Statistics and diagnostics.
pub mod stats;

// Re-export main types
pub use config::{Config, HashFunction, ShardMapBuilder, DEFAULT_SHARD_COUNT, MAX_SHARD_COUNT};
pub use error::{Error, PruneError};
pub use map::{PruneAction, ShardedMap};
pub use stats::{Diagnostics, PruneStats, ShardOps, Stats};
