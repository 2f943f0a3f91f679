//! Backend selection

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::StoreConfig;
use super::contract::LogStore;
use super::errors::StoreResult;
use crate::backends::{FjallStore, RedbStore, SledStore};

/// The embedded engines a store can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// B+tree file with single-writer ACID transactions
    Redb,
    /// LSM tree with a transactional keyspace
    Fjall,
    /// LSM-style tree used without transactions
    Sled,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Redb, BackendKind::Fjall, BackendKind::Sled];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Redb => "redb",
            BackendKind::Fjall => "fjall",
            BackendKind::Sled => "sled",
        }
    }

    /// Whether scans run inside a snapshot that later writes cannot affect
    pub fn has_snapshot_reads(&self) -> bool {
        match self {
            BackendKind::Redb | BackendKind::Fjall => true,
            BackendKind::Sled => false,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redb" => Ok(BackendKind::Redb),
            "fjall" => Ok(BackendKind::Fjall),
            "sled" => Ok(BackendKind::Sled),
            other => Err(format!(
                "unknown datastore '{}'; valid: redb, fjall, sled",
                other
            )),
        }
    }
}

/// Opens the store at `path` on the chosen engine.
///
/// `path` is a file for redb and a directory for fjall and sled. Namespace
/// validation and creation happen here; any failure is an engine-open error.
pub fn open_backend(
    kind: BackendKind,
    path: &Path,
    config: StoreConfig,
) -> StoreResult<Arc<dyn LogStore>> {
    config.namespaces.validate()?;

    let store: Arc<dyn LogStore> = match kind {
        BackendKind::Redb => Arc::new(RedbStore::open(path, config)?),
        BackendKind::Fjall => Arc::new(FjallStore::open(path, config)?),
        BackendKind::Sled => Arc::new(SledStore::open(path, config)?),
    };
    Ok(store)
}
