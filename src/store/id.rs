//! Log entry identifiers
//!
//! An id must be:
//! - unique, without central coordination
//! - lexicographically ordered by the time it was minted
//! - free of the codec separator
//!
//! Nothing else about its encoding is relied upon by the store.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

/// Source of time-ordered, unique ids. Shared by all writers of a store.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Mints the next id. Every call returns a value greater than the last.
    fn next_id(&self) -> String;
}

/// UUIDv7 ids rendered as 32 lowercase hex digits.
///
/// UUIDv7 leads with a millisecond timestamp followed by random bits. Two ids
/// minted in the same millisecond are not ordered by the format alone, so the
/// last value is remembered and bumped when the clock has not moved past it.
#[derive(Debug, Default)]
pub struct UuidV7Generator {
    last: Mutex<u128>,
}

impl UuidV7Generator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> String {
        let candidate = Uuid::now_v7().as_u128();
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = if candidate > *last {
            candidate
        } else {
            last.wrapping_add(1)
        };
        *last = next;
        Uuid::from_u128(next).simple().to_string()
    }
}

/// Zero-padded counter ids.
///
/// Deterministic, so two stores fed the same operations end up with
/// byte-identical logs. Only unique within one generator.
#[derive(Debug)]
pub struct SequenceIdGenerator {
    next: AtomicU64,
}

impl SequenceIdGenerator {
    /// Starts counting at `start`
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequenceIdGenerator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&self) -> String {
        format!("{:020}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}
