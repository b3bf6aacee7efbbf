//! Conformance suite run against every version-store adapter: both
//! adapters must satisfy the same invariants.

use std::sync::Arc;
use std::thread;

use serde_json::{Map, Value};

use arbiter_storage::{
    FileVersionStore, MemoryVersionStore, StorageError, VersionMeta, VersionStatus, VersionStore,
};

fn content(tag: &str) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("tag".to_string(), Value::String(tag.to_string()));
    m
}

fn exercise_version_numbers(store: &dyn VersionStore) {
    for i in 1..=5u32 {
        let v = store
            .create_version("rule1", content(&i.to_string()), VersionMeta::default())
            .unwrap();
        assert_eq!(v.version_number, i);
        assert_eq!(v.status, VersionStatus::Active);
    }
    let numbers: Vec<u32> = store
        .list_versions("rule1", None)
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();
    assert_eq!(numbers, vec![5, 4, 3, 2, 1]);
}

fn exercise_exactly_one_active(store: &dyn VersionStore) {
    for i in 1..=3u32 {
        store
            .create_version("rule1", content(&i.to_string()), VersionMeta::default())
            .unwrap();
    }
    let active: Vec<_> = store
        .list_versions("rule1", None)
        .unwrap()
        .into_iter()
        .filter(|v| v.status == VersionStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].version_number, 3);
}

fn exercise_rollback(store: &dyn VersionStore) {
    let v1 = store
        .create_version("rule1", content("1"), VersionMeta::default())
        .unwrap();
    let v2 = store
        .create_version("rule1", content("2"), VersionMeta::default())
        .unwrap();
    let v3 = store
        .create_version("rule1", content("3"), VersionMeta::default())
        .unwrap();

    assert_eq!(
        store.get_active_version("rule1").unwrap().unwrap().id,
        v3.id
    );

    store.activate_version(&v1.id).unwrap();
    assert_eq!(
        store.get_active_version("rule1").unwrap().unwrap().id,
        v1.id
    );
    for id in [&v2.id, &v3.id] {
        assert_eq!(
            store.get_version(id).unwrap().status,
            VersionStatus::Archived
        );
    }

    // The active version cannot be deleted; archived ones can.
    assert!(matches!(
        store.delete_version(&v1.id),
        Err(StorageError::Validation(_))
    ));
    store.delete_version(&v2.id).unwrap();
    assert!(matches!(
        store.get_version(&v2.id),
        Err(StorageError::NotFound(_))
    ));
}

fn exercise_lookups(store: &dyn VersionStore) {
    assert!(store.get_active_version("rule1").unwrap().is_none());
    let v = store
        .create_version("rule1", content("1"), VersionMeta::default())
        .unwrap();
    assert_eq!(store.get_version(&v.id).unwrap(), v);
    assert_eq!(store.get_version_by_number("rule1", 1).unwrap(), v);
    assert!(matches!(
        store.get_version_by_number("rule1", 9),
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        store.get_version("missing"),
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        store.activate_version("missing"),
        Err(StorageError::NotFound(_))
    ));
}

fn exercise_concurrent_creates(store: Arc<dyn VersionStore>) {
    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..5 {
                store
                    .create_version("rule1", content("x"), VersionMeta::default())
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let versions = store.list_versions("rule1", None).unwrap();
    assert_eq!(versions.len(), 20);
    // Version numbers are a gap-free prefix of the positive integers.
    let mut numbers: Vec<u32> = versions.iter().map(|v| v.version_number).collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=20).collect::<Vec<u32>>());
    // And exactly one version is active.
    let active = versions
        .iter()
        .filter(|v| v.status == VersionStatus::Active)
        .count();
    assert_eq!(active, 1);
}

// ── Memory adapter ──────────────────────────────────────────────

#[test]
fn memory_version_numbers() {
    exercise_version_numbers(&MemoryVersionStore::new());
}

#[test]
fn memory_exactly_one_active() {
    exercise_exactly_one_active(&MemoryVersionStore::new());
}

#[test]
fn memory_rollback() {
    exercise_rollback(&MemoryVersionStore::new());
}

#[test]
fn memory_lookups() {
    exercise_lookups(&MemoryVersionStore::new());
}

#[test]
fn memory_concurrent_creates() {
    exercise_concurrent_creates(Arc::new(MemoryVersionStore::new()));
}

// ── File adapter ────────────────────────────────────────────────

#[test]
fn file_version_numbers() {
    let dir = tempfile::TempDir::new().unwrap();
    exercise_version_numbers(&FileVersionStore::new(dir.path()));
}

#[test]
fn file_exactly_one_active() {
    let dir = tempfile::TempDir::new().unwrap();
    exercise_exactly_one_active(&FileVersionStore::new(dir.path()));
}

#[test]
fn file_rollback() {
    let dir = tempfile::TempDir::new().unwrap();
    exercise_rollback(&FileVersionStore::new(dir.path()));
}

#[test]
fn file_lookups() {
    let dir = tempfile::TempDir::new().unwrap();
    exercise_lookups(&FileVersionStore::new(dir.path()));
}

#[test]
fn file_concurrent_creates() {
    let dir = tempfile::TempDir::new().unwrap();
    exercise_concurrent_creates(Arc::new(FileVersionStore::new(dir.path())));
}

#[test]
fn file_layout_matches_rule_and_number() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = FileVersionStore::new(dir.path());
    store
        .create_version("loan-approval", content("a"), VersionMeta::default())
        .unwrap();
    store
        .create_version("loan-approval", content("b"), VersionMeta::default())
        .unwrap();
    assert!(dir.path().join("loan-approval/1.json").exists());
    assert!(dir.path().join("loan-approval/2.json").exists());
}
