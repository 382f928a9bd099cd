use crate::shard::Shard;

/// Iterator that copies one shard at a time and yields from the copy.
///
/// Each shard's read lock is held only while its entries are copied into an
/// internal buffer, never while the caller consumes items. Every entry present
/// in a shard at the moment that shard is copied is yielded exactly once.
/// Shards are copied at different instants, so the overall result is not a
/// point-in-time view of the map.
///
/// Because no lock is held between `next` calls, the map may be mutated
/// freely while iterating.
pub struct ShardIter<'a, V> {
    shards: &'a [Shard<V>],
    current_shard: usize,
    buffer: std::vec::IntoIter<(String, V)>,
}

impl<'a, V> ShardIter<'a, V>
where
    V: Clone + Send + Sync,
{
    pub(crate) fn new(shards: &'a [Shard<V>]) -> Self {
        Self {
            shards,
            current_shard: 0,
            buffer: Vec::new().into_iter(),
        }
    }

    /// Refill the buffer from the next non-empty shard.
    fn fill_buffer(&mut self) -> bool {
        while self.current_shard < self.shards.len() {
            let entries = self.shards[self.current_shard].entries();
            self.current_shard += 1;
            if !entries.is_empty() {
                self.buffer = entries.into_iter();
                return true;
            }
        }
        false
    }
}

impl<'a, V> Iterator for ShardIter<'a, V>
where
    V: Clone + Send + Sync,
{
    type Item = (String, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(item);
            }
            if !self.fill_buffer() {
                return None;
            }
        }
    }
}

impl<'a, V> std::iter::FusedIterator for ShardIter<'a, V> where V: Clone + Send + Sync {}
