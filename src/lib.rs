//! modb - an append-only op-log document store
//!
//! Documents are never stored as state. Each mutation (put, inc, incby, del)
//! is appended to an op-log under `log:<key>:<id>`, and a document's history
//! is read back as an ordered sequence of changes. Two stores that saw the
//! same operations produce the same SHA-256 history signature.
//!
//! The log can sit on any of three embedded engines, chosen when the store
//! is opened:
//!
//! - `redb`: B+tree file, single-writer transactions
//! - `fjall`: LSM tree, transactional keyspace
//! - `sled`: LSM-style tree, no transactions
//!
//! ```ignore
//! use modb::store::{open_backend, BackendKind, LogStore, StoreConfig};
//!
//! let store = open_backend(BackendKind::Redb, path, StoreConfig::default())?;
//! store.put("chilts", r#"{"name":"Andrew"}"#)?;
//! store.inc("chilts", r#"{"logins":true}"#)?;
//! let signature = store.signature("chilts")?;
//! store.close()?;
//! ```

pub mod backends;
pub mod cli;
pub mod observability;
pub mod server;
pub mod store;
