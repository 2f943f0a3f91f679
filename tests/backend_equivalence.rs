//! Backend Equivalence Tests
//!
//! The same operations against every engine must produce:
//! - the same decoded history, oldest first
//! - the same raw log bytes, given the same ids
//! - the same signature
//!
//! Every test runs once per `BackendKind`.

use std::sync::Arc;

use modb::server::{inc_payload, incby_payload};
use modb::store::{
    open_backend, BackendKind, Change, LogStore, OpKind, RawEntry, SequenceIdGenerator,
    Signature, StoreConfig, StoreErrorCode, StoreResult,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn store_path(temp_dir: &TempDir, kind: BackendKind) -> std::path::PathBuf {
    match kind {
        BackendKind::Redb => temp_dir.path().join("modb.redb"),
        _ => temp_dir.path().join(kind.as_str()),
    }
}

/// Store with deterministic ids starting at 1
fn open_sequenced(temp_dir: &TempDir, kind: BackendKind) -> Arc<dyn LogStore> {
    let config = StoreConfig::default().with_ids(Arc::new(SequenceIdGenerator::default()));
    open_backend(kind, &store_path(temp_dir, kind), config).expect("open store")
}

fn changes(store: &dyn LogStore, key: &str) -> Vec<Change> {
    store
        .iterate_changes(key)
        .unwrap()
        .collect::<StoreResult<_>>()
        .unwrap()
}

fn raw_log(store: &dyn LogStore) -> Vec<RawEntry> {
    store
        .iterate_log()
        .unwrap()
        .collect::<StoreResult<_>>()
        .unwrap()
}

/// put, inc, incby on "chilts"
fn replay_scenario(store: &dyn LogStore) {
    store.put("chilts", r#"{"name":"Andrew"}"#).unwrap();
    store.inc("chilts", &inc_payload(&["logins"])).unwrap();
    store
        .inc_by("chilts", &incby_payload(&["logins", "5", "visits", "2"], 3).unwrap())
        .unwrap();
}

// =============================================================================
// Round-trip and ordering
// =============================================================================

#[test]
fn test_put_round_trips() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);

        let id = store.put("chilts", r#"{"name":"Andrew"}"#).unwrap();
        let history = changes(store.as_ref(), "chilts");

        assert_eq!(history.len(), 1, "{}", kind);
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].key, "chilts");
        assert_eq!(history[0].op, "put");
        assert_eq!(history[0].diff, r#"{"name":"Andrew"}"#);
        assert_eq!(history[0].kind(), Some(OpKind::Put));
    }
}

#[test]
fn test_history_is_in_write_order() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);

        let mut ids = Vec::new();
        for i in 0..25 {
            ids.push(store.inc_by("chilts", &format!(r#"{{"n":{}}}"#, i)).unwrap());
        }

        let history = changes(store.as_ref(), "chilts");
        let seen: Vec<_> = history.iter().map(|c| c.id.clone()).collect();
        assert_eq!(seen, ids, "{}", kind);
        assert_eq!(history[24].diff, r#"{"n":24}"#);
    }
}

#[test]
fn test_unknown_key_has_empty_history() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        store.put("chilts", "{}").unwrap();

        assert!(changes(store.as_ref(), "nobody").is_empty(), "{}", kind);
        let signature = store.signature("nobody").unwrap();
        assert_eq!(signature.count, 0);
        assert_eq!(signature, Signature::of_changes(&Vec::<Change>::new()));
    }
}

// =============================================================================
// Namespace isolation
// =============================================================================

#[test]
fn test_keys_sharing_a_prefix_are_isolated() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);

        store.put("user", "{}").unwrap();
        store.put("user1", "{}").unwrap();
        store.put("username", "{}").unwrap();
        store.del("user", "{}").unwrap();

        let history = changes(store.as_ref(), "user");
        assert_eq!(history.len(), 2, "{}", kind);
        assert!(history.iter().all(|c| c.key == "user"));
        assert_eq!(changes(store.as_ref(), "user1").len(), 1);
    }
}

#[test]
fn test_log_and_data_are_separate() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        replay_scenario(store.as_ref());

        let log = raw_log(store.as_ref());
        assert_eq!(log.len(), 3, "{}", kind);
        assert!(log.iter().all(|e| e.key.starts_with(b"log:")));
        assert_eq!(store.iterate_data().unwrap().count(), 0);
    }
}

#[test]
fn test_separator_in_key_is_rejected() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);

        let err = store.put("a:b", "{}").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::Validation, "{}", kind);
        assert!(store.put("", "{}").is_err());
        assert!(store.iterate_changes("a:b").is_err());
        assert_eq!(raw_log(store.as_ref()).len(), 0);
    }
}

// =============================================================================
// Signatures
// =============================================================================

#[test]
fn test_signature_matches_recomputation() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        replay_scenario(store.as_ref());

        let history = changes(store.as_ref(), "chilts");
        let signature = store.signature("chilts").unwrap();
        assert_eq!(signature, Signature::of_changes(&history), "{}", kind);
        assert_eq!(signature.count, 3);
        assert_eq!(signature.digest.len(), 64);
    }
}

#[test]
fn test_signature_changes_with_every_append() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        replay_scenario(store.as_ref());

        let before = store.signature("chilts").unwrap();
        store.del("chilts", "{}").unwrap();
        let after = store.signature("chilts").unwrap();

        assert_eq!(after.count, before.count + 1);
        assert_ne!(after.digest, before.digest, "{}", kind);
    }
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn test_scenario_put_then_iterate() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        store.put("chilts", r#"{"name":"Andrew"}"#).unwrap();

        let history = changes(store.as_ref(), "chilts");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].op, "put");
        assert_eq!(history[0].diff, r#"{"name":"Andrew"}"#);
    }
}

#[test]
fn test_scenario_inc_and_incby_payloads() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        replay_scenario(store.as_ref());

        let history = changes(store.as_ref(), "chilts");
        assert_eq!(history[1].op, "inc");
        assert_eq!(history[1].diff, r#"{"logins":true}"#);
        assert_eq!(history[2].op, "incby");
        assert_eq!(history[2].diff, r#"{"logins":5,"visits":2}"#);
    }

    assert!(incby_payload(&["logins"], 3).is_err());
    assert!(incby_payload(&["logins", "5", "visits"], 3).is_err());
}

#[test]
fn test_scenario_independent_stores_agree() {
    let mut signatures = Vec::new();
    let mut logs = Vec::new();

    for kind in BackendKind::ALL {
        for _ in 0..2 {
            let temp_dir = TempDir::new().unwrap();
            let store = open_sequenced(&temp_dir, kind);
            replay_scenario(store.as_ref());

            signatures.push(store.signature("chilts").unwrap());
            logs.push(raw_log(store.as_ref()));
            store.close().unwrap();
        }
    }

    assert_eq!(signatures[0].count, 3);
    assert!(signatures.windows(2).all(|w| w[0] == w[1]));
    assert!(logs.windows(2).all(|w| w[0] == w[1]));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_history_survives_reopen() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let signature = {
            let store = open_sequenced(&temp_dir, kind);
            replay_scenario(store.as_ref());
            store.close().unwrap();
            store.signature("chilts").unwrap_err();
            drop(store);
            let reopened = open_backend(
                kind,
                &store_path(&temp_dir, kind),
                StoreConfig::default(),
            )
            .unwrap();
            let signature = reopened.signature("chilts").unwrap();
            reopened.close().unwrap();
            signature
        };
        assert_eq!(signature.count, 3, "{}", kind);
    }
}

#[test]
fn test_closed_store_refuses_work() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let store = open_sequenced(&temp_dir, kind);
        store.close().unwrap();

        assert_eq!(
            store.put("chilts", "{}").unwrap_err().code(),
            StoreErrorCode::WriteFailed,
            "{}",
            kind
        );
        assert_eq!(
            store.iterate_log().err().map(|e| e.code()),
            Some(StoreErrorCode::ReadFailed)
        );
        store.close().unwrap();
    }
}

#[test]
fn test_close_releases_engine_while_handle_alive() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let first = open_sequenced(&temp_dir, kind);
        replay_scenario(first.as_ref());
        first.close().unwrap();

        let second = open_backend(kind, &store_path(&temp_dir, kind), StoreConfig::default())
            .unwrap_or_else(|e| panic!("{}: reopen after close failed: {}", kind, e));
        assert_eq!(second.signature("chilts").unwrap().count, 3, "{}", kind);

        // The first handle stays closed
        assert_eq!(
            first.put("chilts", "{}").unwrap_err().code(),
            StoreErrorCode::WriteFailed
        );
        second.close().unwrap();
    }
}

#[test]
fn test_concurrent_writers_get_distinct_ordered_ids() {
    for kind in BackendKind::ALL {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::default().with_sync_writes(false);
        let store = open_backend(kind, &store_path(&temp_dir, kind), config).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..20 {
                        store
                            .inc_by("counter", &format!(r#"{{"t{}":{}}}"#, t, i))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = changes(store.as_ref(), "counter");
        assert_eq!(history.len(), 80, "{}", kind);
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
    }
}
