//! Statistics and diagnostics types.

#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-shard operation statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardOps {
    /// Number of successful lookups on this shard.
    pub reads: u64,
    /// Number of inserts and in-place updates on this shard.
    pub writes: u64,
    /// Number of entries removed from this shard.
    pub removes: u64,
    /// Number of lock acquisitions (0 when metrics feature disabled).
    pub lock_acquisitions: u64,
    /// Cumulative lock wait time in nanoseconds (0 when lock-timing disabled).
    pub lock_wait_nanos: u64,
}

/// Thread-safe statistics tracker for a single shard.
#[cfg(feature = "metrics")]
pub(crate) struct ShardStats {
    reads: AtomicU64,
    writes: AtomicU64,
    removes: AtomicU64,
    lock_acquisitions: AtomicU64,
    #[cfg(feature = "lock-timing")]
    lock_wait_nanos: AtomicU64,
}

#[cfg(feature = "metrics")]
impl ShardStats {
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            removes: AtomicU64::new(0),
            lock_acquisitions: AtomicU64::new(0),
            #[cfg(feature = "lock-timing")]
            lock_wait_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_removes(&self, count: u64) {
        self.removes.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_lock_acquisition(&self) {
        self.lock_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(feature = "lock-timing")]
    #[inline]
    pub fn record_lock_wait(&self, nanos: u64) {
        self.lock_wait_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ShardOps {
        ShardOps {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            lock_acquisitions: self.lock_acquisitions.load(Ordering::Relaxed),
            #[cfg(feature = "lock-timing")]
            lock_wait_nanos: self.lock_wait_nanos.load(Ordering::Relaxed),
            #[cfg(not(feature = "lock-timing"))]
            lock_wait_nanos: 0,
        }
    }
}

/// Zero-sized placeholder when metrics are disabled.
#[cfg(not(feature = "metrics"))]
pub(crate) struct ShardStats;

#[cfg(not(feature = "metrics"))]
impl ShardStats {
    pub fn new() -> Self {
        ShardStats
    }

    #[inline]
    pub fn record_read(&self) {}

    #[inline]
    pub fn record_write(&self) {}

    #[inline]
    pub fn record_removes(&self, _count: u64) {}

    #[inline]
    pub fn record_lock_acquisition(&self) {}

    pub fn snapshot(&self) -> ShardOps {
        ShardOps::default()
    }
}

/// Aggregate statistics for a ShardedMap instance.
///
/// Gathered one shard at a time, so under concurrent writes `size` need not
/// match any single instant.
#[derive(Debug, Clone)]
pub struct Stats {
    /// Total number of entries across all shards.
    pub size: usize,
    /// Number of entries in each shard.
    pub shard_sizes: Vec<usize>,
    /// Operation counts for each shard.
    pub operations: Vec<ShardOps>,
}

impl Stats {
    /// Derive load-distribution diagnostics from these statistics.
    pub fn diagnostics(&self) -> Diagnostics {
        let shards: Vec<ShardDiagnostics> = self
            .shard_sizes
            .iter()
            .zip(self.operations.iter())
            .map(|(&entries, ops)| ShardDiagnostics {
                entries,
                reads: ops.reads,
                writes: ops.writes,
                removes: ops.removes,
                lock_acquisitions: ops.lock_acquisitions,
                lock_wait_nanos: ops.lock_wait_nanos,
            })
            .collect();

        let total_operations = shards
            .iter()
            .map(|s| s.reads + s.writes + s.removes)
            .sum();

        let avg_load_per_shard = if shards.is_empty() {
            0.0
        } else {
            self.size as f64 / shards.len() as f64
        };
        let max_load = self.shard_sizes.iter().copied().max().unwrap_or(0);
        let max_load_ratio = if avg_load_per_shard > 0.0 {
            max_load as f64 / avg_load_per_shard
        } else {
            0.0
        };

        Diagnostics {
            total_entries: self.size,
            shards,
            total_operations,
            avg_load_per_shard,
            max_load_ratio,
        }
    }
}

/// Per-shard diagnostics snapshot.
#[derive(Debug, Clone)]
pub struct ShardDiagnostics {
    /// Number of entries in this shard.
    pub entries: usize,
    /// Read operations (0 when metrics disabled).
    pub reads: u64,
    /// Write operations (0 when metrics disabled).
    pub writes: u64,
    /// Remove operations (0 when metrics disabled).
    pub removes: u64,
    /// Lock acquisitions (0 when metrics disabled).
    pub lock_acquisitions: u64,
    /// Cumulative lock wait time in nanoseconds (0 when lock-timing disabled).
    pub lock_wait_nanos: u64,
}

/// Structured snapshot for performance introspection.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Total number of entries across all shards.
    pub total_entries: usize,
    /// Per-shard diagnostics.
    pub shards: Vec<ShardDiagnostics>,
    /// Total read + write + remove operations (0 when metrics disabled).
    pub total_operations: u64,
    /// Average load (entries) per shard.
    pub avg_load_per_shard: f64,
    /// Max load / avg load ratio. User interprets (e.g. threshold 2.0 for imbalance).
    pub max_load_ratio: f64,
}

/// Result of a completed prune pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Entries removed.
    pub deleted: usize,
    /// Entries visited and kept.
    pub retained: usize,
}

impl std::ops::AddAssign for PruneStats {
    fn add_assign(&mut self, rhs: Self) {
        self.deleted += rhs.deleted;
        self.retained += rhs.retained;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_from_even_load() {
        let stats = Stats {
            size: 8,
            shard_sizes: vec![2, 2, 2, 2],
            operations: vec![ShardOps::default(); 4],
        };
        let diag = stats.diagnostics();
        assert_eq!(diag.total_entries, 8);
        assert_eq!(diag.shards.len(), 4);
        assert!((diag.avg_load_per_shard - 2.0).abs() < f64::EPSILON);
        assert!((diag.max_load_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn diagnostics_from_skewed_load() {
        let stats = Stats {
            size: 4,
            shard_sizes: vec![4, 0, 0, 0],
            operations: vec![ShardOps::default(); 4],
        };
        let diag = stats.diagnostics();
        assert!((diag.max_load_ratio - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn diagnostics_of_empty_map() {
        let stats = Stats {
            size: 0,
            shard_sizes: vec![0; 2],
            operations: vec![ShardOps::default(); 2],
        };
        let diag = stats.diagnostics();
        assert_eq!(diag.total_operations, 0);
        assert_eq!(diag.max_load_ratio, 0.0);
    }
}
