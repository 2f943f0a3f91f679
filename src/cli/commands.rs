//! CLI command implementations
//!
//! `server` is the only long-running command besides the interactive
//! `client`. `dump` and `signature` open the store, read it, print to stdout
//! and close it again. redb and sled refuse to open a store a running
//! server holds; fjall does not, so the offline commands must not be pointed
//! at a fjall store that is being served.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::observability::{log_event, log_event_with_fields, Event, ObservationScope};
use crate::server::{Context, Server};
use crate::store::{open_backend, DumpTarget, IdGenerator, LogStore, UuidV7Generator};

use super::args::{Cli, Command, StoreArgs};
use super::client::run_session;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_dump, write_signature};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Server { store, addr } => server(&store, addr),
        Command::Dump { store, target } => dump(&store, target),
        Command::Signature { store, key } => signature(&store, &key),
        Command::Client { addr, config } => client(addr, config),
    }
}

/// Config file with command-line flags applied on top
fn resolve_config(args: &StoreArgs) -> CliResult<Config> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(datastore) = args.datastore {
        config.datastore = datastore;
    }
    config.validate()?;

    let datastore = config.datastore.to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("datastore", &datastore)]);
    Ok(config)
}

fn open_store(
    path: &Path,
    config: &Config,
    ids: Arc<dyn IdGenerator>,
) -> CliResult<Arc<dyn LogStore>> {
    let store = open_backend(config.datastore, path, config.store_config(ids))?;

    let path = path.display().to_string();
    log_event_with_fields(
        Event::StoreOpened,
        &[("datastore", store.kind().as_str()), ("path", &path)],
    );
    Ok(store)
}

fn close_store(store: &dyn LogStore) -> CliResult<()> {
    store.close()?;
    log_event(Event::StoreClosed);
    Ok(())
}

/// Serve the store until Ctrl-C
///
/// 1. Resolve config, open the store
/// 2. Bind the listener on a fresh tokio runtime
/// 3. Serve; on Ctrl-C drain connections and close the store
pub fn server(args: &StoreArgs, addr: Option<String>) -> CliResult<()> {
    log_event(Event::StartupBegin);

    let config = resolve_config(args)?;
    let mut server_config = config.server_config();
    if let Some(addr) = addr {
        server_config.listen_addr = addr;
    }

    let ids: Arc<dyn IdGenerator> = Arc::new(UuidV7Generator::new());
    let store = open_store(&args.path, &config, Arc::clone(&ids))?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let served = rt.block_on(async {
        let server = Server::bind(&server_config, Context::new(Arc::clone(&store), ids))
            .await
            .map_err(|e| {
                CliError::boot_failed(format!(
                    "Failed to listen on {}: {}",
                    server_config.listen_addr, e
                ))
            })?;
        log_event(Event::StartupComplete);

        server.run_until_ctrl_c().await.map_err(CliError::from)
    });

    // A running server closes the store on shutdown; this covers a failed bind.
    if served.is_err() {
        let _ = store.close();
    }
    served
}

/// Print raw entries of one or both namespaces
pub fn dump(args: &StoreArgs, target: DumpTarget) -> CliResult<()> {
    let config = resolve_config(args)?;
    let store = open_store(&args.path, &config, Arc::new(UuidV7Generator::new()))?;

    let scope = ObservationScope::with_fields("DUMP", vec![("target", target.to_string())]);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match write_dump(store.as_ref(), target, &mut out) {
        Ok(written) => scope.complete_with(&[("entries", written.to_string())]),
        Err(e) => {
            scope.fail(e.message());
            let _ = store.close();
            return Err(e);
        }
    }

    close_store(store.as_ref())
}

/// Print `<count> <digest>` for one key
pub fn signature(args: &StoreArgs, key: &str) -> CliResult<()> {
    let config = resolve_config(args)?;
    let store = open_store(&args.path, &config, Arc::new(UuidV7Generator::new()))?;

    let scope = ObservationScope::with_fields("SIGNATURE", vec![("key", key.to_string())]);
    let signature = match store.signature(key) {
        Ok(signature) => signature,
        Err(e) => {
            scope.fail(&e.to_string());
            let _ = store.close();
            return Err(e.into());
        }
    };
    scope.complete_with(&[("count", signature.count.to_string())]);

    let stdout = io::stdout();
    write_signature(&signature, &mut stdout.lock())?;

    close_store(store.as_ref())
}

/// Prompt on stdin against a running server until end of input or `quit`
pub fn client(addr: Option<String>, config: Option<PathBuf>) -> CliResult<()> {
    let config = Config::load_or_default(config.as_deref())?;
    let addr = addr.unwrap_or(config.listen_addr);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let input = tokio::io::BufReader::new(tokio::io::stdin());
        let stdout = io::stdout();
        let mut out = stdout.lock();
        run_session(&addr, input, &mut out).await.map(|_| ())
    })
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use crate::store::{BackendKind, StoreConfig};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn store_args(temp_dir: &TempDir, datastore: BackendKind) -> StoreArgs {
        StoreArgs {
            path: temp_dir.path().join("db"),
            datastore: Some(datastore),
            config: None,
        }
    }

    #[test]
    fn test_flag_overrides_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("modb.json");
        fs::write(&config_path, json!({ "datastore": "fjall" }).to_string()).unwrap();

        let mut args = store_args(&temp_dir, BackendKind::Sled);
        args.config = Some(config_path.clone());
        assert_eq!(resolve_config(&args).unwrap().datastore, BackendKind::Sled);

        args.datastore = None;
        assert_eq!(resolve_config(&args).unwrap().datastore, BackendKind::Fjall);
    }

    #[test]
    fn test_dump_and_signature_on_existing_store() {
        let temp_dir = TempDir::new().unwrap();
        let args = store_args(&temp_dir, BackendKind::Redb);
        {
            let store = open_backend(BackendKind::Redb, &args.path, StoreConfig::default()).unwrap();
            store.put("chilts", "{}").unwrap();
            store.close().unwrap();
        }

        dump(&args, DumpTarget::Log).unwrap();
        signature(&args, "chilts").unwrap();
    }

    #[test]
    fn test_signature_rejects_bad_key() {
        let temp_dir = TempDir::new().unwrap();
        let args = store_args(&temp_dir, BackendKind::Redb);
        let err = signature(&args, "a:b").unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::StoreError);
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = store_args(&temp_dir, BackendKind::Redb);
        args.config = Some(temp_dir.path().join("absent.json"));
        let err = dump(&args, DumpTarget::All).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
