//! CLI argument definitions using clap
//!
//! Commands:
//! - modb server <path> [--datastore K] [--addr A] [--config F]
//! - modb dump <path> [--datastore K] [--target log|data|all] [--config F]
//! - modb signature <path> <key> [--datastore K] [--config F]
//! - modb client [--addr A] [--config F]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::store::{BackendKind, DumpTarget};

/// modb - an append-only op-log document store
#[derive(Parser, Debug)]
#[command(name = "modb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where the store lives and how to open it
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Database file (redb) or directory (fjall, sled)
    pub path: PathBuf,

    /// Embedded engine: redb, fjall or sled (overrides the config file)
    #[arg(long, short = 'd')]
    pub datastore: Option<BackendKind>,

    /// Path to a JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the store over the Redis wire protocol until Ctrl-C
    Server {
        #[command(flatten)]
        store: StoreArgs,

        /// Listen address (overrides the config file)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Print raw log and/or data entries
    Dump {
        #[command(flatten)]
        store: StoreArgs,

        /// Which namespace to print: log, data or all
        #[arg(long, default_value = "all")]
        target: DumpTarget,
    },

    /// Print the change count and history digest of one key
    Signature {
        #[command(flatten)]
        store: StoreArgs,

        /// Document key
        key: String,
    },

    /// Interactive prompt against a running server
    Client {
        /// Server address (overrides the config file)
        #[arg(long)]
        addr: Option<String>,

        /// Path to a JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server() {
        let cli = Cli::try_parse_from([
            "modb", "server", "/tmp/modb", "--datastore", "fjall", "--addr", "0.0.0.0:1",
        ])
        .unwrap();
        let Command::Server { store, addr } = cli.command else {
            panic!("expected server");
        };
        assert_eq!(store.path, PathBuf::from("/tmp/modb"));
        assert_eq!(store.datastore, Some(BackendKind::Fjall));
        assert_eq!(addr.as_deref(), Some("0.0.0.0:1"));
    }

    #[test]
    fn test_parse_dump_defaults_to_all() {
        let cli = Cli::try_parse_from(["modb", "dump", "db.redb"]).unwrap();
        let Command::Dump { store, target } = cli.command else {
            panic!("expected dump");
        };
        assert_eq!(target, DumpTarget::All);
        assert_eq!(store.datastore, None);
    }

    #[test]
    fn test_parse_signature() {
        let cli = Cli::try_parse_from(["modb", "signature", "db", "chilts", "-d", "sled"]).unwrap();
        let Command::Signature { store, key } = cli.command else {
            panic!("expected signature");
        };
        assert_eq!(key, "chilts");
        assert_eq!(store.datastore, Some(BackendKind::Sled));
    }

    #[test]
    fn test_parse_client() {
        let cli = Cli::try_parse_from(["modb", "client", "--addr", "127.0.0.1:7000"]).unwrap();
        let Command::Client { addr, config } = cli.command else {
            panic!("expected client");
        };
        assert_eq!(addr.as_deref(), Some("127.0.0.1:7000"));
        assert_eq!(config, None);

        assert!(Cli::try_parse_from(["modb", "client"]).is_ok());
    }

    #[test]
    fn test_rejects_unknown_datastore() {
        assert!(Cli::try_parse_from(["modb", "dump", "db", "--datastore", "bbolt"]).is_err());
        assert!(Cli::try_parse_from(["modb", "dump", "db", "--target", "users"]).is_err());
    }
}
