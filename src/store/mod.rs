//! Op-log store for modb
//!
//! Every mutation is appended to the log as an immutable entry; nothing is
//! ever updated or removed in place. A document's history is read back by a
//! bounded prefix scan and decoded into [`Change`] records.
//!
//! # Design Principles
//!
//! - Append-only (a delete is a new entry)
//! - One encode-and-commit path for all operation kinds
//! - One codec shared by every backend
//! - Corruption is reported, never skipped
//!
//! # Layout
//!
//! ```text
//! log:<key>:<id>   ->   <kind>:<json>
//! ```
//!
//! `data:` is reserved for materialized state and is never written yet.

mod backend;
mod changes;
mod codec;
mod config;
mod contract;
mod dump;
mod errors;
mod id;
mod op;
mod signature;

pub use backend::{open_backend, BackendKind};
pub use changes::ChangeIter;
pub use codec::{prefix_upper_bound, Codec, Namespaces};
pub use config::StoreConfig;
pub use contract::{EntryIter, LogStore, RawEntry};
pub use dump::{DumpTarget, Namespace};
pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use id::{IdGenerator, SequenceIdGenerator, UuidV7Generator};
pub use op::{Change, OpKind};
pub use signature::{Signature, SignatureBuilder};

pub(crate) use contract::EngineSlot;
