//! Construction-time configuration handed to every backend

use std::sync::Arc;

use super::codec::Namespaces;
use super::id::{IdGenerator, UuidV7Generator};

/// Everything a backend needs besides its path.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Namespace prefixes and separator used by the codec
    pub namespaces: Namespaces,
    /// Flush the engine's journal to disk on every commit
    pub sync_writes: bool,
    /// Id source shared by all writers of the store
    pub ids: Arc<dyn IdGenerator>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespaces: Namespaces::default(),
            sync_writes: true,
            ids: Arc::new(UuidV7Generator::new()),
        }
    }
}

impl StoreConfig {
    /// Replace the id generator
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replace the namespaces
    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Enable or disable a flush per commit
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }
}
