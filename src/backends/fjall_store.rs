//! LSM backend on a fjall transactional keyspace
//!
//! Both namespaces share one partition and are told apart by their string
//! prefix, so namespace creation on open is just opening that partition.
//! Writes go through the keyspace's single-writer transaction; scans use a
//! read transaction and see the snapshot taken when the scan started.
//!
//! fjall takes no lock on its directory, so a second keyspace can be opened
//! on the same path while this one is live. Callers must not do that.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fjall::{Config, PartitionCreateOptions, PersistMode, TxKeyspace, TxPartitionHandle};

use super::bounded;
use crate::store::{
    BackendKind, Codec, EngineSlot, EntryIter, IdGenerator, LogStore, OpKind, RawEntry,
    StoreConfig, StoreError, StoreErrorCode, StoreResult,
};

const PARTITION: &str = "entries";

/// Keyspace plus the partition holding both namespaces
struct Engine {
    keyspace: TxKeyspace,
    entries: TxPartitionHandle,
}

pub struct FjallStore {
    engine: EngineSlot<Engine>,
    path: PathBuf,
    codec: Codec,
    ids: Arc<dyn IdGenerator>,
    sync_writes: bool,
}

impl FjallStore {
    /// Opens or creates the keyspace directory and its partition.
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(path).map_err(|e| {
            StoreError::engine_open(format!("failed to create directory: {}", path.display()), e)
        })?;

        let keyspace = Config::new(path).open_transactional().map_err(|e| {
            StoreError::engine_open(format!("failed to open fjall keyspace: {}", path.display()), e)
        })?;
        let entries = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .map_err(|e| StoreError::engine_open("failed to open partition", e))?;

        Ok(Self {
            engine: EngineSlot::new(Engine { keyspace, entries }),
            path: path.to_path_buf(),
            codec: Codec::new(config.namespaces),
            ids: config.ids,
            sync_writes: config.sync_writes,
        })
    }
}

impl fmt::Debug for FjallStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FjallStore")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl LogStore for FjallStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Fjall
    }

    fn codec(&self) -> &Codec {
        &self.codec
    }

    fn append(&self, key: &str, kind: OpKind, json: &str) -> StoreResult<String> {
        self.codec.validate_key(key)?;

        self.engine.with(StoreErrorCode::WriteFailed, |engine| {
            let mut tx = engine.keyspace.write_tx();

            // Minted while holding the writer slot so id order is commit order.
            let id = self.ids.next_id();
            let (log_key, log_value) = self.codec.encode(key, kind, &id, json);
            tx.insert(&engine.entries, log_key, log_value);
            tx.commit()
                .map_err(|e| StoreError::write_failed("failed to commit log entry", e))?;

            if self.sync_writes {
                engine
                    .keyspace
                    .persist(PersistMode::SyncAll)
                    .map_err(|e| StoreError::write_failed("failed to sync journal", e))?;
            }

            Ok(id)
        })
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<EntryIter<'_>> {
        self.engine.with(StoreErrorCode::ReadFailed, |engine| {
            let snapshot = engine.keyspace.read_tx();
            let cursor = snapshot
                .prefix(&engine.entries, prefix.to_vec())
                .map(|item| {
                    item.map(|(k, v)| RawEntry::new(k.to_vec(), v.to_vec()))
                        .map_err(|e| StoreError::read_failed("prefix iterator failed", e))
                });

            Ok(bounded(cursor, prefix))
        })
    }

    fn close(&self) -> StoreResult<()> {
        let Some(engine) = self.engine.take()? else {
            return Ok(());
        };
        engine
            .keyspace
            .persist(PersistMode::SyncAll)
            .map_err(|e| StoreError::write_failed("failed to sync journal on close", e))
    }
}
