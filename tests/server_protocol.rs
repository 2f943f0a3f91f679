//! Request Server Protocol Tests
//!
//! Drives a real server over TCP on an ephemeral port, speaking RESP2 the
//! way redis-cli does.

use std::sync::Arc;

use modb::cli::run_session;
use modb::server::{Context, Server, ServerConfig};
use modb::store::{open_backend, BackendKind, IdGenerator, LogStore, SequenceIdGenerator, StoreConfig};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

// =============================================================================
// Test Utilities
// =============================================================================

/// Decoded reply, enough to assert on
#[derive(Debug, PartialEq)]
enum Value {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<String>),
    Array(Vec<Value>),
}

fn bulk(s: &str) -> Value {
    Value::Bulk(Some(s.to_string()))
}

struct Client {
    reader: BufReader<TcpStream>,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            reader: BufReader::new(stream),
        }
    }

    /// Sends a multibulk request and reads one reply
    async fn call(&mut self, args: &[&str]) -> Value {
        let mut request = format!("*{}\r\n", args.len()).into_bytes();
        for arg in args {
            request.extend_from_slice(format!("${}\r\n{}\r\n", arg.len(), arg).as_bytes());
        }
        self.reader.get_mut().write_all(&request).await.unwrap();
        self.read_value().await
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.reader.get_mut().write_all(bytes).await.unwrap();
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end_matches("\r\n").to_string()
    }

    fn read_value(&mut self) -> std::pin::Pin<Box<dyn std::future::Future<Output = Value> + Send + '_>> {
        Box::pin(async move {
            let line = self.read_line().await;
            let (tag, rest) = line.split_at(1);
            match tag {
                "+" => Value::Simple(rest.to_string()),
                "-" => Value::Error(rest.to_string()),
                ":" => Value::Integer(rest.parse().unwrap()),
                "$" => {
                    let len: i64 = rest.parse().unwrap();
                    if len < 0 {
                        return Value::Bulk(None);
                    }
                    let mut data = vec![0u8; len as usize + 2];
                    self.reader.read_exact(&mut data).await.unwrap();
                    data.truncate(len as usize);
                    Value::Bulk(Some(String::from_utf8(data).unwrap()))
                }
                "*" => {
                    let len: usize = rest.parse().unwrap();
                    let mut items = Vec::with_capacity(len);
                    for _ in 0..len {
                        items.push(self.read_value().await);
                    }
                    Value::Array(items)
                }
                other => panic!("unexpected reply tag {:?}", other),
            }
        })
    }

    /// True once the server has closed the connection
    async fn at_eof(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.reader.read(&mut buf).await, Ok(0) | Err(_))
    }
}

struct Running {
    addr: std::net::SocketAddr,
    store: Arc<dyn LogStore>,
    handle: modb::server::ShutdownHandle,
    task: JoinHandle<()>,
    _temp_dir: TempDir,
}

async fn start(kind: BackendKind) -> Running {
    let temp_dir = TempDir::new().unwrap();
    let ids: Arc<dyn IdGenerator> = Arc::new(SequenceIdGenerator::default());
    let config = StoreConfig::default().with_ids(Arc::clone(&ids));
    let store = open_backend(kind, &temp_dir.path().join("db"), config).unwrap();

    let server_config = ServerConfig::with_listen_addr("127.0.0.1:0");
    let server = Server::bind(&server_config, Context::new(Arc::clone(&store), ids))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();
    let task = tokio::spawn(async move {
        server.run().await.unwrap();
    });

    Running {
        addr,
        store,
        handle,
        task,
        _temp_dir: temp_dir,
    }
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test]
async fn test_ping_time_id() {
    let running = start(BackendKind::Redb).await;
    let mut client = Client::connect(running.addr).await;

    assert_eq!(client.call(&["PING"]).await, Value::Simple("PONG".into()));

    let Value::Simple(time) = client.call(&["time"]).await else {
        panic!("time must be a simple string");
    };
    assert_eq!(time.len(), 24);
    assert!(time.ends_with('Z'));

    assert_eq!(
        client.call(&["id"]).await,
        Value::Simple("00000000000000000001".into())
    );
}

#[tokio::test]
async fn test_scenario_over_the_wire() {
    for kind in BackendKind::ALL {
        let running = start(kind).await;
        let mut client = Client::connect(running.addr).await;

        let ok = Value::Simple("OK".into());
        assert_eq!(client.call(&["put", "chilts", r#"{"name":"Andrew"}"#]).await, ok);
        assert_eq!(client.call(&["inc", "chilts", "logins"]).await, ok);
        assert_eq!(
            client.call(&["incby", "chilts", "logins", "5", "visits", "2"]).await,
            ok
        );

        let changes = client.call(&["changes", "chilts"]).await;
        assert_eq!(
            changes,
            Value::Array(vec![
                Value::Array(vec![
                    bulk("00000000000000000001"),
                    bulk("put"),
                    bulk(r#"{"name":"Andrew"}"#)
                ]),
                Value::Array(vec![
                    bulk("00000000000000000002"),
                    bulk("inc"),
                    bulk(r#"{"logins":true}"#)
                ]),
                Value::Array(vec![
                    bulk("00000000000000000003"),
                    bulk("incby"),
                    bulk(r#"{"logins":5,"visits":2}"#)
                ]),
            ]),
            "{}",
            kind
        );

        let expected = running.store.signature("chilts").unwrap();
        assert_eq!(
            client.call(&["signature", "chilts"]).await,
            Value::Array(vec![bulk("3"), bulk(&expected.digest)])
        );

        running.handle.shutdown();
        running.task.await.unwrap();
    }
}

#[tokio::test]
async fn test_argument_errors() {
    let running = start(BackendKind::Sled).await;
    let mut client = Client::connect(running.addr).await;

    let Value::Error(msg) = client.call(&["incby", "chilts", "logins"]).await else {
        panic!("expected error");
    };
    assert!(msg.starts_with("ERR wrong number of arguments"));

    assert_eq!(
        client.call(&["incby", "chilts", "logins", "lots"]).await,
        Value::Error("ERR invalid count 'lots' at argument 4".into())
    );
    assert_eq!(
        client.call(&["dump", "users"]).await,
        Value::Error("ERR unknown target".into())
    );
    assert_eq!(
        client.call(&["flushall"]).await,
        Value::Error("ERR unknown command 'flushall'".into())
    );

    let Value::Error(msg) = client.call(&["put", "chilts", "not json"]).await else {
        panic!("expected error");
    };
    assert!(msg.starts_with("ERR invalid JSON"));

    let Value::Error(msg) = client.call(&["put", "a:b", "{}"]).await else {
        panic!("expected error");
    };
    assert!(msg.contains("separator"));

    // Nothing reached the log
    assert_eq!(running.store.iterate_log().unwrap().count(), 0);
}

#[tokio::test]
async fn test_del_and_dump() {
    let running = start(BackendKind::Fjall).await;
    let mut client = Client::connect(running.addr).await;

    assert_eq!(client.call(&["del", "chilts"]).await, Value::Simple("OK".into()));
    assert_eq!(
        client.call(&["dump", "log"]).await,
        Value::Array(vec![bulk("log:chilts:00000000000000000001"), bulk("del:{}")])
    );
    assert_eq!(client.call(&["dump", "data"]).await, Value::Array(vec![]));
    assert_eq!(
        client.call(&["dump"]).await,
        Value::Array(vec![bulk("log:chilts:00000000000000000001"), bulk("del:{}")])
    );
}

#[tokio::test]
async fn test_inline_and_pipelined_requests() {
    let running = start(BackendKind::Redb).await;
    let mut client = Client::connect(running.addr).await;

    client.send_raw(b"PING\r\ninc chilts logins\r\n*2\r\n$9\r\nsignature\r\n$6\r\nchilts\r\n").await;
    assert_eq!(client.read_value().await, Value::Simple("PONG".into()));
    assert_eq!(client.read_value().await, Value::Simple("OK".into()));
    let Value::Array(parts) = client.read_value().await else {
        panic!("expected array");
    };
    assert_eq!(parts[0], bulk("1"));
}

#[tokio::test]
async fn test_quit_closes_connection() {
    let running = start(BackendKind::Redb).await;
    let mut client = Client::connect(running.addr).await;

    assert_eq!(client.call(&["quit"]).await, Value::Simple("OK".into()));
    assert!(client.at_eof().await);
}

#[tokio::test]
async fn test_malformed_request_closes_connection() {
    let running = start(BackendKind::Redb).await;
    let mut client = Client::connect(running.addr).await;

    client.send_raw(b"*1\r\n:5\r\n").await;
    let Value::Error(msg) = client.read_value().await else {
        panic!("expected error");
    };
    assert!(msg.starts_with("ERR Protocol error"));
    assert!(client.at_eof().await);
}

#[tokio::test]
async fn test_unterminated_header_line_closes_connection() {
    let running = start(BackendKind::Redb).await;
    let mut client = Client::connect(running.addr).await;

    // One byte past the 64 KiB header limit, so the server has read it all
    let mut header = b"*1\r\n$".to_vec();
    header.extend(std::iter::repeat(b'9').take(64 * 1024 + 1));
    client.send_raw(&header).await;

    let Value::Error(msg) = client.read_value().await else {
        panic!("expected error");
    };
    assert!(msg.contains("header line"));
    assert!(client.at_eof().await);
}

// =============================================================================
// Interactive client
// =============================================================================

#[tokio::test]
async fn test_client_session() {
    let running = start(BackendKind::Redb).await;
    let input = concat!(
        "put chilts {\"name\":\"Andrew\"}\n",
        "\n",
        "inc chilts \"logins\"\n",
        "put \"chilts\n",
        "changes chilts\n",
        "dump users\n",
        "quit\n",
        "ping\n",
    );

    let mut out = Vec::new();
    let sent = run_session(&running.addr.to_string(), input.as_bytes(), &mut out)
        .await
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(sent, 5);
    assert!(out.starts_with("modb> OK\n"));
    assert!(out.contains("(error) ERR unbalanced quotes"));
    assert!(out.contains("1) 1) \"00000000000000000001\"\n   2) \"put\""));
    assert!(out.contains("2) 1) \"00000000000000000002\"\n   2) \"inc\"\n   3) \"{\\\"logins\\\":true}\""));
    assert!(out.contains("(error) ERR unknown target"));
    assert!(out.ends_with("modb> OK\n"));
    assert!(!out.contains("PONG"));

    assert_eq!(running.store.signature("chilts").unwrap().count, 2);
}

#[tokio::test]
async fn test_client_reports_unreachable_server() {
    let running = start(BackendKind::Redb).await;
    let addr = running.addr.to_string();
    running.handle.shutdown();
    running.task.await.unwrap();

    let mut out = Vec::new();
    let err = run_session(&addr, &b"ping\n"[..], &mut out).await.unwrap_err();
    assert_eq!(err.code_str(), "MODB_CLI_CLIENT_FAILED");
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_shutdown_drains_and_closes_store() {
    let running = start(BackendKind::Redb).await;
    let mut client = Client::connect(running.addr).await;
    assert_eq!(
        client.call(&["put", "chilts", "{}"]).await,
        Value::Simple("OK".into())
    );

    running.handle.shutdown();
    running.task.await.unwrap();

    // Idle connection was let go and the store no longer accepts writes
    assert!(client.at_eof().await);
    assert!(running.store.put("chilts", "{}").is_err());
    assert!(TcpStream::connect(running.addr).await.is_err());
}
