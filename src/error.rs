use crate::stats::PruneStats;

/// Errors that can occur when operating on a ShardedMap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A shard index outside `[0, shard_count)` was requested.
    #[error("shard index {index} out of range (map has {shard_count} shards)")]
    ShardOutOfRange {
        /// The index that was requested.
        index: usize,
        /// The number of shards in the map.
        shard_count: usize,
    },
}

/// A prune pass stopped because its predicate returned an error.
///
/// Work committed before the failure is not rolled back: entries deleted on
/// earlier shards (and earlier in the failing shard) stay deleted.
#[derive(Debug)]
pub struct PruneError<E> {
    /// Entries deleted before the abort.
    pub deleted: usize,
    /// Entries visited and kept before the abort.
    pub retained: usize,
    /// The error returned by the predicate.
    pub error: E,
}

impl<E> PruneError<E> {
    /// Counts accumulated before the predicate failed.
    pub fn stats(&self) -> PruneStats {
        PruneStats {
            deleted: self.deleted,
            retained: self.retained,
        }
    }

    /// Discard the counts and return the predicate's error.
    pub fn into_error(self) -> E {
        self.error
    }
}

impl<E: std::fmt::Display> std::fmt::Display for PruneError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "prune aborted after deleting {} and retaining {} entries: {}",
            self.deleted, self.retained, self.error
        )
    }
}

impl<E> std::error::Error for PruneError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
