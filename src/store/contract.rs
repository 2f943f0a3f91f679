//! The storage contract every backend implements
//!
//! Backends supply four primitives: the codec they were built with, one
//! encode-and-commit routine, an ordered prefix scan, and close. Everything
//! else (the four mutation kinds, log/data/changes iteration, signatures) is
//! layered on top here, once, so the backends cannot drift apart.

use std::fmt;
use std::sync::RwLock;

use super::backend::BackendKind;
use super::changes::ChangeIter;
use super::codec::Codec;
use super::errors::{StoreError, StoreErrorCode, StoreResult};
use super::op::OpKind;
use super::signature::Signature;

/// One raw `(key, value)` pair as stored by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl RawEntry {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Forward-only, finite sequence of raw entries in ascending key order.
///
/// Restarting means calling the scan again. An engine error is yielded once
/// and ends the sequence.
pub type EntryIter<'a> = Box<dyn Iterator<Item = StoreResult<RawEntry>> + 'a>;

/// An append-only op-log over one embedded engine.
///
/// All methods block until the engine has finished. One instance is shared by
/// every caller; the engine arbitrates concurrent writers.
pub trait LogStore: Send + Sync + fmt::Debug {
    /// Which engine this is
    fn kind(&self) -> BackendKind;

    /// The codec every entry of this store is written with
    fn codec(&self) -> &Codec;

    /// Mints an id and commits one log entry for `(key, kind, json)`.
    ///
    /// This is the only write path. `json` must already be a validated JSON
    /// object; `key` is checked against the codec before anything is written.
    /// Returns the minted id.
    fn append(&self, key: &str, kind: OpKind, json: &str) -> StoreResult<String>;

    /// Ordered scan of every entry whose key starts with `prefix`.
    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<EntryIter<'_>>;

    /// Flushes the engine and refuses further operations.
    ///
    /// Callers must drain in-flight operations first. Calling it again is a
    /// no-op that returns `Ok(())`.
    fn close(&self) -> StoreResult<()>;

    /// Records a full replacement of the document
    fn put(&self, key: &str, json: &str) -> StoreResult<String> {
        self.append(key, OpKind::Put, json)
    }

    /// Records `{"field": true, ...}` increments
    fn inc(&self, key: &str, json: &str) -> StoreResult<String> {
        self.append(key, OpKind::Inc, json)
    }

    /// Records `{"field": delta, ...}` increments
    fn inc_by(&self, key: &str, json: &str) -> StoreResult<String> {
        self.append(key, OpKind::IncBy, json)
    }

    /// Records a tombstone. The payload is kept verbatim for audit.
    fn del(&self, key: &str, json: &str) -> StoreResult<String> {
        self.append(key, OpKind::Del, json)
    }

    /// Every op-log entry, raw, in key order
    fn iterate_log(&self) -> StoreResult<EntryIter<'_>> {
        self.scan_prefix(self.codec().log_prefix())
    }

    /// Every materialized-data entry, raw, in key order
    fn iterate_data(&self) -> StoreResult<EntryIter<'_>> {
        self.scan_prefix(self.codec().data_prefix())
    }

    /// The decoded history of one document key, oldest first.
    ///
    /// A key with no history yields an empty sequence.
    fn iterate_changes(&self, key: &str) -> StoreResult<ChangeIter<'_>> {
        self.codec().validate_key(key)?;
        let prefix = self.codec().changes_prefix(key);
        let entries = self.scan_prefix(&prefix)?;
        Ok(ChangeIter::new(self.codec(), key, entries))
    }

    /// Digest of one key's full history
    fn signature(&self, key: &str) -> StoreResult<Signature> {
        Signature::compute(self.iterate_changes(key)?)
    }
}

/// The open engine handle of a backend, or nothing once it is closed.
///
/// Operations hold the read side for as long as they touch the engine;
/// `take` waits for them and hands the engine out to be flushed and dropped,
/// which is what releases its files and locks.
pub(crate) struct EngineSlot<T>(RwLock<Option<T>>);

impl<T> EngineSlot<T> {
    pub(crate) fn new(engine: T) -> Self {
        Self(RwLock::new(Some(engine)))
    }

    /// Runs `f` against the open engine; fails with `code` once closed
    pub(crate) fn with<R>(
        &self,
        code: StoreErrorCode,
        f: impl FnOnce(&T) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let guard = self.0.read().map_err(|_| StoreError::poisoned(code))?;
        match guard.as_ref() {
            Some(engine) => f(engine),
            None => Err(StoreError::closed(code)),
        }
    }

    /// Removes the engine; `None` if it was already taken
    pub(crate) fn take(&self) -> StoreResult<Option<T>> {
        let mut guard = self
            .0
            .write()
            .map_err(|_| StoreError::poisoned(StoreErrorCode::WriteFailed))?;
        Ok(guard.take())
    }
}
