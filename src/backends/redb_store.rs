//! B+tree backend on redb
//!
//! Each namespace lives in its own table (`log`, `data`), created on open.
//! Keys keep their namespace prefix inside the table so raw iteration looks
//! the same as on the flat-keyspace engines.
//!
//! Writes run in a single-writer write transaction; scans run in a read
//! transaction and see the snapshot taken when the scan started. `close()`
//! drops the database, releasing its file lock even while other handles to
//! the store are still alive.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, Durability, TableDefinition};

use super::bounded;
use crate::store::{
    BackendKind, Codec, EngineSlot, EntryIter, IdGenerator, LogStore, OpKind, RawEntry,
    StoreConfig, StoreError, StoreErrorCode, StoreResult,
};

const LOG_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("log");
const DATA_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("data");

pub struct RedbStore {
    db: EngineSlot<Database>,
    path: PathBuf,
    codec: Codec,
    ids: Arc<dyn IdGenerator>,
    durability: Durability,
}

impl RedbStore {
    /// Opens or creates the database file and both namespace tables.
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    StoreError::engine_open(
                        format!("failed to create directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let db = Database::create(path).map_err(|e| {
            StoreError::engine_open(format!("failed to open redb file: {}", path.display()), e)
        })?;

        let txn = db
            .begin_write()
            .map_err(|e| StoreError::engine_open("failed to begin namespace transaction", e))?;
        {
            txn.open_table(LOG_TABLE)
                .map_err(|e| StoreError::engine_open("failed to create log table", e))?;
            txn.open_table(DATA_TABLE)
                .map_err(|e| StoreError::engine_open("failed to create data table", e))?;
        }
        txn.commit()
            .map_err(|e| StoreError::engine_open("failed to commit namespace tables", e))?;

        let durability = if config.sync_writes {
            Durability::Immediate
        } else {
            Durability::Eventual
        };

        Ok(Self {
            db: EngineSlot::new(db),
            path: path.to_path_buf(),
            codec: Codec::new(config.namespaces),
            ids: config.ids,
            durability,
        })
    }

    /// Tables whose namespace can hold keys starting with `prefix`, in key
    /// order of their namespace prefix.
    fn tables_for(&self, prefix: &[u8]) -> Vec<TableDefinition<'static, &'static [u8], &'static [u8]>> {
        let mut candidates = vec![
            (self.codec.log_prefix(), LOG_TABLE),
            (self.codec.data_prefix(), DATA_TABLE),
        ];
        candidates.retain(|(ns, _)| prefix.starts_with(ns) || ns.starts_with(prefix));
        candidates.sort_by(|a, b| a.0.cmp(b.0));
        candidates.into_iter().map(|(_, table)| table).collect()
    }
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl LogStore for RedbStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Redb
    }

    fn codec(&self) -> &Codec {
        &self.codec
    }

    fn append(&self, key: &str, kind: OpKind, json: &str) -> StoreResult<String> {
        self.codec.validate_key(key)?;

        self.db.with(StoreErrorCode::WriteFailed, |db| {
            let mut txn = db
                .begin_write()
                .map_err(|e| StoreError::write_failed("failed to begin write transaction", e))?;
            txn.set_durability(self.durability);

            // Minted inside the write lock so id order is commit order.
            let id = self.ids.next_id();
            let (log_key, log_value) = self.codec.encode(key, kind, &id, json);
            {
                let mut table = txn
                    .open_table(LOG_TABLE)
                    .map_err(|e| StoreError::write_failed("failed to open log table", e))?;
                table
                    .insert(log_key.as_slice(), log_value.as_slice())
                    .map_err(|e| StoreError::write_failed("failed to insert log entry", e))?;
            }
            txn.commit()
                .map_err(|e| StoreError::write_failed("failed to commit log entry", e))?;

            Ok(id)
        })
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<EntryIter<'_>> {
        self.db.with(StoreErrorCode::ReadFailed, |db| {
            let txn = db
                .begin_read()
                .map_err(|e| StoreError::read_failed("failed to begin read transaction", e))?;

            let mut cursors = Vec::new();
            for definition in self.tables_for(prefix) {
                let table = txn
                    .open_table(definition)
                    .map_err(|e| StoreError::read_failed("failed to open table", e))?;
                let range = table
                    .range(prefix..)
                    .map_err(|e| StoreError::read_failed("failed to seek cursor", e))?;
                cursors.push(range.map(|item| {
                    item.map(|(k, v)| RawEntry::new(k.value().to_vec(), v.value().to_vec()))
                        .map_err(|e| StoreError::read_failed("cursor read failed", e))
                }));
            }

            Ok(bounded(cursors.into_iter().flatten(), prefix))
        })
    }

    fn close(&self) -> StoreResult<()> {
        // Commits are already durable at the configured level.
        drop(self.db.take()?);
        Ok(())
    }
}
