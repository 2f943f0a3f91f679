//! Command parsing and execution
//!
//! Parsing checks arity and builds payloads without touching the store, so
//! a bad request never reaches a blocking thread. Execution runs one command
//! against the store and turns every outcome, failures included, into a
//! reply.

use std::sync::Arc;

use chrono::Utc;

use super::payload::{inc_payload, incby_payload, validate_object};
use super::resp::Reply;
use crate::observability::{log_event_with_fields, Event};
use crate::store::{
    DumpTarget, IdGenerator, LogStore, OpKind, StoreError, StoreErrorCode, StoreResult,
};

/// What every connection shares
#[derive(Debug, Clone)]
pub struct Context {
    pub store: Arc<dyn LogStore>,
    pub ids: Arc<dyn IdGenerator>,
}

impl Context {
    pub fn new(store: Arc<dyn LogStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Time,
    Id,
    /// PUT, INC, INCBY and DEL, with the payload already built
    Append {
        kind: OpKind,
        key: String,
        json: String,
    },
    Signature {
        key: String,
    },
    Changes {
        key: String,
    },
    Dump {
        target: DumpTarget,
    },
    Quit,
}

impl Command {
    /// Parses a non-empty request; the error is the reply to send instead.
    pub fn parse(request: &[Vec<u8>]) -> Result<Command, Reply> {
        let Some((name, rest)) = request.split_first() else {
            return Err(Reply::err("empty command"));
        };
        let name_text = String::from_utf8_lossy(name);
        let args = rest
            .iter()
            .map(|arg| String::from_utf8(arg.clone()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Reply::err("arguments must be valid UTF-8"))?;

        match name_text.to_ascii_lowercase().as_str() {
            "ping" => Ok(Command::Ping),
            "time" => Ok(Command::Time),
            "id" => Ok(Command::Id),
            "put" => {
                let [key, json] = args.as_slice() else {
                    return Err(arity("put <key> <json>"));
                };
                validate_object(json).map_err(|e| Reply::err(e.message()))?;
                Ok(append(OpKind::Put, key, json.clone()))
            }
            "inc" => {
                let Some((key, fields)) = args.split_first().filter(|(_, f)| !f.is_empty()) else {
                    return Err(arity("inc <key> <field> [<field>...]"));
                };
                Ok(append(OpKind::Inc, key, inc_payload(fields)))
            }
            "incby" => {
                if args.len() < 3 || args.len() % 2 == 0 {
                    return Err(arity("incby <key> <field> <count> [<field> <count>...]"));
                }
                // The first field is the third word of the command line.
                let json = incby_payload(&args[1..], 3).map_err(|e| Reply::err(e.message()))?;
                Ok(append(OpKind::IncBy, &args[0], json))
            }
            "del" => {
                let (key, json) = match args.as_slice() {
                    [key] => (key, "{}".to_string()),
                    [key, json] => (key, json.clone()),
                    _ => return Err(arity("del <key> [json]")),
                };
                validate_object(&json).map_err(|e| Reply::err(e.message()))?;
                Ok(append(OpKind::Del, key, json))
            }
            "signature" => match args.as_slice() {
                [key] => Ok(Command::Signature { key: key.clone() }),
                _ => Err(arity("signature <key>")),
            },
            "changes" => match args.as_slice() {
                [key] => Ok(Command::Changes { key: key.clone() }),
                _ => Err(arity("changes <key>")),
            },
            "dump" => match args.as_slice() {
                [] => Ok(Command::Dump {
                    target: DumpTarget::All,
                }),
                [target] => target
                    .parse()
                    .map(|target| Command::Dump { target })
                    .map_err(Reply::err),
                _ => Err(arity("dump [log|data]")),
            },
            "quit" => Ok(Command::Quit),
            _ => Err(Reply::err(format!("unknown command '{}'", name_text))),
        }
    }

    /// Lowercase command name
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Time => "time",
            Command::Id => "id",
            Command::Append { kind, .. } => kind.as_str(),
            Command::Signature { .. } => "signature",
            Command::Changes { .. } => "changes",
            Command::Dump { .. } => "dump",
            Command::Quit => "quit",
        }
    }

    /// Whether executing it calls into the store
    pub fn touches_store(&self) -> bool {
        matches!(
            self,
            Command::Append { .. }
                | Command::Signature { .. }
                | Command::Changes { .. }
                | Command::Dump { .. }
        )
    }
}

fn append(kind: OpKind, key: &str, json: String) -> Command {
    Command::Append {
        kind,
        key: key.to_string(),
        json,
    }
}

fn arity(usage: &str) -> Reply {
    Reply::err(format!("wrong number of arguments: {}", usage))
}

/// Runs one command. Store commands block; call them off the async runtime.
pub fn execute(context: &Context, command: &Command) -> Reply {
    let store = context.store.as_ref();
    let result = match command {
        Command::Ping => Ok(Reply::Simple("PONG".to_string())),
        Command::Time => Ok(Reply::Simple(now_utc())),
        Command::Id => Ok(Reply::Simple(context.ids.next_id())),
        Command::Append { kind, key, json } => store.append(key, *kind, json).map(|_| Reply::ok()),
        Command::Signature { key } => store.signature(key).map(|signature| {
            Reply::Array(vec![
                Reply::bulk(signature.count.to_string()),
                Reply::bulk(signature.digest),
            ])
        }),
        Command::Changes { key } => changes(store, key),
        Command::Dump { target } => dump(store, *target),
        Command::Quit => Ok(Reply::ok()),
    };

    result.unwrap_or_else(|err| store_error_reply(command, &err))
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
fn now_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn changes(store: &dyn LogStore, key: &str) -> StoreResult<Reply> {
    let mut rows = Vec::new();
    for change in store.iterate_changes(key)? {
        let change = change?;
        rows.push(Reply::Array(vec![
            Reply::bulk(change.id),
            Reply::bulk(change.op),
            Reply::bulk(change.diff),
        ]));
    }
    Ok(Reply::Array(rows))
}

fn dump(store: &dyn LogStore, target: DumpTarget) -> StoreResult<Reply> {
    let mut flat = Vec::new();
    for namespace in target.namespaces() {
        for entry in namespace.scan(store)? {
            let entry = entry?;
            flat.push(Reply::Bulk(entry.key));
            flat.push(Reply::Bulk(entry.value));
        }
    }
    Ok(Reply::Array(flat))
}

/// Logs the failure and maps it to what the client is told.
fn store_error_reply(command: &Command, err: &StoreError) -> Reply {
    let (event, reply) = match err.code() {
        StoreErrorCode::Validation => (Event::CommandRejected, Reply::err(err.message())),
        StoreErrorCode::WriteFailed | StoreErrorCode::EngineOpen => {
            (Event::StoreWriteFailed, Reply::err("writing to datastore"))
        }
        StoreErrorCode::ReadFailed => (Event::StoreReadFailed, Reply::err("reading from datastore")),
        StoreErrorCode::CorruptEntry => (Event::StoreCorruption, Reply::err("corrupt log entry")),
    };

    let error = err.to_string();
    log_event_with_fields(event, &[("command", command.name()), ("error", &error)]);
    reply
}
