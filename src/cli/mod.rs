//! CLI module for modb
//!
//! Provides command-line interface for:
//! - server: serve a store over the Redis wire protocol
//! - dump: print raw log/data entries
//! - signature: print one key's history digest
//! - client: interactive prompt against a running server

mod args;
mod client;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, StoreArgs};
pub use client::{format_reply, run_session, split_words, Connection};
pub use commands::{client, dump, run, run_command, server, signature};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_dump, write_signature};
