//! Request server
//!
//! Speaks the Redis wire protocol (RESP2), so `redis-cli` or any Redis
//! client library can drive a store:
//!
//! ```text
//! PING                                   +PONG
//! PUT chilts {"name":"Andrew"}           +OK
//! INC chilts logins                      +OK
//! INCBY chilts logins 5 age 1            +OK
//! DEL chilts                             +OK
//! SIGNATURE chilts                       *2  $1 4  $64 <hex>
//! CHANGES chilts                         *4  *3 <id> <op> <diff> ...
//! DUMP [log|data]                        *2n <key> <value> ...
//! TIME / ID / QUIT
//! ```
//!
//! `modb client` speaks the same framing from the other end.
//!
//! Connections are served on the tokio runtime; every command that touches
//! the store runs on the blocking pool against one shared store handle.

mod commands;
mod config;
mod errors;
mod listener;
mod payload;
mod resp;

pub use commands::{execute, Command, Context};
pub use config::ServerConfig;
pub use errors::{ProtocolError, ProtocolResult};
pub use listener::{Server, ShutdownHandle};
pub use payload::{inc_payload, incby_payload, validate_object};
pub use resp::{encode_request, parse_reply, parse_request, Reply, Request};
