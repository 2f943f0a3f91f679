//! Engine adapters implementing [`LogStore`](crate::store::LogStore)
//!
//! | engine | writes | scans |
//! |--------|--------|-------|
//! | redb   | single-writer ACID write transaction | read transaction snapshot, range seek + prefix check |
//! | fjall  | transactional keyspace, single writer | read transaction snapshot, prefix iterator |
//! | sled   | one insert, no transaction | range iterator `[prefix, upper bound)`, no snapshot |
//!
//! Each operation is exactly one physical write, so every backend commits it
//! atomically under its own crash model.

mod fjall_store;
mod redb_store;
mod sled_store;

pub use fjall_store::FjallStore;
pub use redb_store::RedbStore;
pub use sled_store::SledStore;

use crate::store::{EntryIter, RawEntry, StoreResult};

/// Wraps an engine cursor so it ends at the first key outside `prefix` or
/// right after yielding an error.
pub(crate) fn bounded<'a, I>(entries: I, prefix: &[u8]) -> EntryIter<'a>
where
    I: Iterator<Item = StoreResult<RawEntry>> + 'a,
{
    Box::new(PrefixBounded {
        inner: entries,
        prefix: prefix.to_vec(),
        done: false,
    })
}

struct PrefixBounded<I> {
    inner: I,
    prefix: Vec<u8>,
    done: bool,
}

impl<I> Iterator for PrefixBounded<I>
where
    I: Iterator<Item = StoreResult<RawEntry>>,
{
    type Item = StoreResult<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next() {
            Some(Ok(entry)) if entry.key.starts_with(&self.prefix) => Some(Ok(entry)),
            Some(Ok(_)) | None => {
                self.done = true;
                None
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
