//! Change reconstruction
//!
//! Turns the raw, key-ordered entries of one document's log prefix into typed
//! [`Change`] records. Corruption aborts the sequence: the decode error is
//! yielded once and nothing after it is produced, so a damaged log is never
//! silently shortened.

use super::codec::Codec;
use super::contract::EntryIter;
use super::errors::{StoreError, StoreResult};
use super::op::Change;

/// Lazy sequence of one key's changes, in ascending id order.
pub struct ChangeIter<'a> {
    codec: &'a Codec,
    key: String,
    entries: EntryIter<'a>,
    last_id: Option<String>,
    done: bool,
}

impl<'a> ChangeIter<'a> {
    pub fn new(codec: &'a Codec, key: &str, entries: EntryIter<'a>) -> Self {
        Self {
            codec,
            key: key.to_string(),
            entries,
            last_id: None,
            done: false,
        }
    }

    fn decode_next(&mut self) -> Option<StoreResult<Change>> {
        let entry = match self.entries.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };

        let change = match self.codec.decode(&entry.key, &entry.value) {
            Ok(change) => change,
            Err(e) => return Some(Err(e)),
        };

        if change.key != self.key {
            return Some(Err(StoreError::corrupt_entry(
                &entry.key,
                format!("entry belongs to key '{}', expected '{}'", change.key, self.key),
            )));
        }

        if let Some(ref last) = self.last_id {
            if change.id <= *last {
                return Some(Err(StoreError::corrupt_entry(
                    &entry.key,
                    format!("id '{}' does not follow '{}'", change.id, last),
                )));
            }
        }
        self.last_id = Some(change.id.clone());

        Some(Ok(change))
    }
}

impl Iterator for ChangeIter<'_> {
    type Item = StoreResult<Change>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.decode_next();
        match item {
            Some(Ok(_)) => {}
            _ => self.done = true,
        }
        item
    }
}
