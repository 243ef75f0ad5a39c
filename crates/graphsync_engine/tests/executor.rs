mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{blocked, init_logging, rate_limited, FakeApi};
use graphsync_core::{ActionQueue, ExclusionSet};
use graphsync_engine::{
    AppendLog, ExecuteError, Executor, MemoryAppendLog, MemoryPageStore, Mutation, PageStore,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const RECOVERABLE: &[u32] = &[162];

fn queue(identifiers: &[&str]) -> ActionQueue {
    ExclusionSet::new().filter(identifiers)
}

fn failing_on(identifier: &str, err: graphsync_engine::ApiError) -> FakeApi {
    FakeApi {
        mutation_failures: HashMap::from([(identifier.to_string(), err)]),
        ..FakeApi::new()
    }
}

#[tokio::test]
async fn blocked_action_is_logged_and_run_continues() {
    init_logging();
    let api = failing_on("c", blocked());
    let store = MemoryPageStore::new();
    let ledger = MemoryAppendLog::new();

    let report = Executor::new(&api, &store, &ledger, Duration::ZERO, RECOVERABLE)
        .run(Mutation::Follow, &queue(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap();

    assert_eq!(
        ledger.read_lines("followed.txt").unwrap(),
        vec!["a", "b", "c", "d", "e"]
    );
    assert_eq!(report.completed, vec!["a", "b", "d", "e"]);
    assert_eq!(report.skipped_blocked, vec!["c"]);
    assert_eq!(api.mutated(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn unrecognised_error_aborts_the_rest_of_the_queue() {
    init_logging();
    let api = failing_on("c", rate_limited());
    let store = MemoryPageStore::new();
    let ledger = MemoryAppendLog::new();

    let err = Executor::new(&api, &store, &ledger, Duration::ZERO, RECOVERABLE)
        .run(Mutation::Follow, &queue(&["a", "b", "c", "d", "e"]))
        .await
        .unwrap_err();

    match err {
        ExecuteError::Remote {
            identifier,
            completed,
            ..
        } => {
            assert_eq!(identifier, "c");
            assert_eq!(completed, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ledger.read_lines("followed.txt").unwrap(), vec!["a", "b"]);
    assert_eq!(api.mutated(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn recoverable_codes_are_configurable() {
    let api = failing_on("b", blocked());
    let store = MemoryPageStore::new();
    let ledger = MemoryAppendLog::new();

    let result = Executor::new(&api, &store, &ledger, Duration::ZERO, &[])
        .run(Mutation::Follow, &queue(&["a", "b"]))
        .await;

    assert!(result.is_err());
    assert_eq!(ledger.read_lines("followed.txt").unwrap(), vec!["a"]);
}

#[tokio::test]
async fn already_logged_identifiers_are_not_sent_again() {
    let api = FakeApi::new();
    let store = MemoryPageStore::new();
    let ledger = MemoryAppendLog::new();
    ledger.append_line("unfollowed.txt", "b").unwrap();

    let report = Executor::new(&api, &store, &ledger, Duration::ZERO, RECOVERABLE)
        .run(Mutation::Unfollow, &queue(&["a", "b", "c"]))
        .await
        .unwrap();

    assert_eq!(api.mutated(), vec!["a", "c"]);
    assert_eq!(report.already_logged, vec!["b"]);
    assert_eq!(
        ledger.read_lines("unfollowed.txt").unwrap(),
        vec!["b", "a", "c"]
    );
}

#[tokio::test]
async fn latest_response_lands_in_the_audit_slot() {
    let api = FakeApi::new();
    let store = MemoryPageStore::new();
    let ledger = MemoryAppendLog::new();

    Executor::new(&api, &store, &ledger, Duration::ZERO, RECOVERABLE)
        .run(Mutation::Unfollow, &queue(&["a", "b"]))
        .await
        .unwrap();

    assert_eq!(
        store.read_slot("friendships-destroy").unwrap(),
        Some(json!({"screen_name": "b", "following": false}))
    );
    assert_eq!(store.read_slot("friendships-create").unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn calls_are_spaced_by_the_configured_delay() {
    let api = FakeApi::new();
    let store = MemoryPageStore::new();
    let ledger = MemoryAppendLog::new();
    let started = tokio::time::Instant::now();

    Executor::new(&api, &store, &ledger, Duration::from_secs(10), RECOVERABLE)
        .run(Mutation::Follow, &queue(&["a", "b", "c"]))
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(20));
}
