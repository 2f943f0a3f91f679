//! Backend on sled, used without transactions
//!
//! Namespaces are string prefixes in the default tree; there is nothing to
//! create on open. Each operation is a single insert, which sled makes
//! atomic on its own. Anything that someday writes more than one key per
//! operation (a derived index, materialized data) would NOT be crash-atomic
//! here.
//!
//! Scans use a range iterator over `[prefix, upper bound)`. Sled iterators
//! are not snapshots: a scan may observe entries committed after it started.
//!
//! `close()` flushes and drops the database handle, so the directory lock is
//! gone once the last in-flight scan finishes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::bounded;
use crate::store::{
    prefix_upper_bound, BackendKind, Codec, EngineSlot, EntryIter, IdGenerator, LogStore, OpKind,
    RawEntry, StoreConfig, StoreError, StoreErrorCode, StoreResult,
};

pub struct SledStore {
    db: EngineSlot<sled::Db>,
    path: PathBuf,
    codec: Codec,
    ids: Arc<dyn IdGenerator>,
    sync_writes: bool,
}

impl SledStore {
    /// Opens or creates the database directory.
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let db = sled::open(path).map_err(|e| {
            StoreError::engine_open(format!("failed to open sled db: {}", path.display()), e)
        })?;

        Ok(Self {
            db: EngineSlot::new(db),
            path: path.to_path_buf(),
            codec: Codec::new(config.namespaces),
            ids: config.ids,
            sync_writes: config.sync_writes,
        })
    }
}

impl fmt::Debug for SledStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SledStore")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl LogStore for SledStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Sled
    }

    fn codec(&self) -> &Codec {
        &self.codec
    }

    fn append(&self, key: &str, kind: OpKind, json: &str) -> StoreResult<String> {
        self.codec.validate_key(key)?;

        self.db.with(StoreErrorCode::WriteFailed, |db| {
            let id = self.ids.next_id();
            let (log_key, log_value) = self.codec.encode(key, kind, &id, json);
            db.insert(log_key, log_value)
                .map_err(|e| StoreError::write_failed("failed to insert log entry", e))?;

            if self.sync_writes {
                db.flush()
                    .map_err(|e| StoreError::write_failed("failed to flush log entry", e))?;
            }

            Ok(id)
        })
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<EntryIter<'_>> {
        self.db.with(StoreErrorCode::ReadFailed, |db| {
            let start = prefix.to_vec();
            let cursor = match prefix_upper_bound(prefix) {
                Some(limit) => db.range(start..limit),
                None => db.range(start..),
            };
            let cursor = cursor.map(|item| {
                item.map(|(k, v)| RawEntry::new(k.to_vec(), v.to_vec()))
                    .map_err(|e| StoreError::read_failed("range iterator failed", e))
            });

            Ok(bounded(cursor, prefix))
        })
    }

    fn close(&self) -> StoreResult<()> {
        let Some(db) = self.db.take()? else {
            return Ok(());
        };
        db.flush()
            .map(|_| ())
            .map_err(|e| StoreError::write_failed("failed to flush on close", e))
    }
}
