use std::fs;

use graphsync_engine::{
    ensure_storage_dir, AppendLog, FsAppendLog, FsPageStore, MemoryAppendLog, MemoryPageStore,
    PageKey, PageStore, PersistError,
};
use serde_json::json;
use tempfile::TempDir;

fn exercise_page_contract(store: &dyn PageStore) {
    let first = PageKey::new("friends", 0);
    assert!(!store.exists(&first));
    assert!(matches!(store.read(&first), Err(PersistError::NotFound(_))));

    store.write(&first, &json!({"page": 0})).unwrap();
    store.write(&PageKey::new("friends", 1), &json!({"page": 1})).unwrap();
    store.write(&PageKey::new("friends", 3), &json!({"page": 3})).unwrap();

    assert!(store.exists(&first));
    assert_eq!(store.read(&first).unwrap(), json!({"page": 0}));
    // Records are append-once.
    assert!(matches!(
        store.write(&first, &json!({"page": "again"})),
        Err(PersistError::AlreadyExists(_))
    ));
    assert_eq!(store.read(&first).unwrap(), json!({"page": 0}));

    // A gap ends the dense prefix.
    assert_eq!(store.count("friends"), 2);
    assert_eq!(store.next_key("friends"), PageKey::new("friends", 2));
    assert_eq!(store.count("friendships"), 0);

    assert_eq!(store.purge("friends").unwrap(), 2);
    assert_eq!(store.count("friends"), 0);
    assert!(store.exists(&PageKey::new("friends", 3)));

    assert_eq!(store.read_slot("friendships-create").unwrap(), None);
    store.write_slot("friendships-create", &json!({"n": 1})).unwrap();
    store.write_slot("friendships-create", &json!({"n": 2})).unwrap();
    assert_eq!(
        store.read_slot("friendships-create").unwrap(),
        Some(json!({"n": 2}))
    );
}

fn exercise_ledger_contract(ledger: &dyn AppendLog) {
    assert!(ledger.read_lines("followed.txt").unwrap().is_empty());
    ledger.append_line("followed.txt", "alice").unwrap();
    ledger.append_line("followed.txt", "bob").unwrap();
    ledger.append_line("unfollowed.txt", "carol").unwrap();

    assert_eq!(ledger.read_lines("followed.txt").unwrap(), vec!["alice", "bob"]);
    // Restartable: a second read starts over.
    assert_eq!(ledger.read_lines("followed.txt").unwrap(), vec!["alice", "bob"]);
    assert_eq!(ledger.read_lines("unfollowed.txt").unwrap(), vec!["carol"]);
}

#[test]
fn filesystem_store_honours_page_contract() {
    let temp = TempDir::new().unwrap();
    let store = FsPageStore::new(temp.path().join("account"));
    exercise_page_contract(&store);
    assert!(temp.path().join("account").join("friends.3.json").is_file());
    assert!(temp.path().join("account").join("friendships-create.json").is_file());
}

#[test]
fn memory_store_honours_page_contract() {
    exercise_page_contract(&MemoryPageStore::new());
}

#[test]
fn filesystem_ledger_honours_contract() {
    let temp = TempDir::new().unwrap();
    let ledger = FsAppendLog::new(temp.path().to_path_buf());
    exercise_ledger_contract(&ledger);
    assert_eq!(
        fs::read_to_string(temp.path().join("followed.txt")).unwrap(),
        "alice\nbob\n"
    );
}

#[test]
fn memory_ledger_honours_contract() {
    exercise_ledger_contract(&MemoryAppendLog::new());
}

#[test]
fn ledger_ignores_blank_lines() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("followed.txt"), "alice\n\n  \nbob\n").unwrap();
    let ledger = FsAppendLog::new(temp.path().to_path_buf());
    assert_eq!(ledger.read_lines("followed.txt").unwrap(), vec!["alice", "bob"]);
}

#[test]
fn malformed_record_is_reported() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("friends.0.json"), "{not json").unwrap();
    let store = FsPageStore::new(temp.path().to_path_buf());
    assert!(matches!(
        store.read(&PageKey::new("friends", 0)),
        Err(PersistError::Malformed { .. })
    ));
}

#[test]
fn creates_missing_storage_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("alice");
    assert!(!new_dir.exists());
    ensure_storage_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn storage_dir_that_is_a_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let store = FsPageStore::new(file_path.clone());
    let result = store.write(&PageKey::new("friends", 0), &json!({}));
    assert!(matches!(result, Err(PersistError::StorageDir(_))));
}
