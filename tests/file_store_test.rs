//! Scenario tests for a resource store over the file backend.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use serde_json::{Map, Value, json};

use common::CountingGenerator;
use memostore::{AppError, Entry, FileBackend, GenerationContext, ResourceStore, canonicalize};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gets_generate_once() {
    let dir = tempfile::tempdir().unwrap();
    let generator = CountingGenerator::with_delay(Duration::from_millis(50));
    let store = ResourceStore::in_directory(dir.path(), generator.clone());

    let key = json!({"image": "a.png", "width": 64});
    let requests: Vec<_> = (0..10).map(|_| tokio::spawn(store.get(&key))).collect();

    let mut values = Vec::new();
    for request in requests {
        values.push(request.await.unwrap().unwrap().value);
    }

    assert_eq!(generator.calls(), 1);
    assert!(values.iter().all(|v| **v == *values[0]));
    assert_eq!(values[0]["call"], json!(1));

    let again = store.get(&key).await.unwrap();
    assert!(again.was_cached);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_member_order_does_not_change_identity() {
    let dir = tempfile::tempdir().unwrap();
    let generator = CountingGenerator::new();
    let store = ResourceStore::in_directory(dir.path(), generator.clone());

    let mut reversed = Map::new();
    reversed.insert("prop2".into(), json!("value2"));
    reversed.insert("prop1".into(), json!("value1"));

    store
        .get(&json!({"prop1": "value1", "prop2": "value2"}))
        .await
        .unwrap();
    let second = store.get(&Value::Object(reversed)).await.unwrap();

    assert!(second.was_cached);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_entries_are_sharded_by_md5() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::in_directory(dir.path(), CountingGenerator::new());

    let entry = store
        .get(&json!({"prop1": "value1", "prop2": "value2"}))
        .await
        .unwrap();

    let base = dir
        .path()
        .join("89")
        .join("a5")
        .join("89a5d6c29115ba547f066e54a82b2412");
    assert!(base.with_extension("json").is_file());
    assert_eq!(entry.storage_path(), Some(base.to_str().unwrap()));

    let raw: Value =
        serde_json::from_slice(&std::fs::read(base.with_extension("json")).unwrap()).unwrap();
    assert_eq!(raw["key"], json!({"prop1": "value1", "prop2": "value2"}));
    assert!(raw["createStarted"].is_i64());
    assert!(raw["createEnded"].is_i64());
    assert!(raw.get("wasCached").is_none());
}

#[tokio::test]
async fn test_scalar_keys_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let generator = CountingGenerator::new();
    let store = ResourceStore::in_directory(dir.path(), generator.clone());

    let keys = [json!("string"), json!(null), json!(true), json!(42), json!("42")];
    for key in &keys {
        let entry = store.get(key).await.unwrap();
        assert!(!entry.was_cached);
        assert_eq!(entry.value["generated"], *key);
    }
    assert_eq!(generator.calls(), keys.len());

    for key in &keys {
        let entry = store.get(key).await.unwrap();
        assert!(entry.was_cached);
        assert_eq!(entry.key, *key);
        assert_eq!(entry.value["generated"], *key);
    }
    assert_eq!(generator.calls(), keys.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_between_gets_regenerates() {
    let dir = tempfile::tempdir().unwrap();
    let generator = CountingGenerator::with_delay(Duration::from_millis(20));
    let store = ResourceStore::in_directory(dir.path(), generator.clone());
    let key = json!({"id": 7});

    let first = store.get(&key);
    let deleted = store.delete(&key);
    let second = store.get(&key);

    let (first, deleted, second) = tokio::join!(first, deleted, second);
    let first = first.unwrap();
    let second = second.unwrap();

    deleted.unwrap();
    assert_eq!(generator.calls(), 2);
    assert!(!first.was_cached);
    assert!(!second.was_cached);
    assert_eq!(first.value["call"], json!(1));
    assert_eq!(second.value["call"], json!(2));
}

#[tokio::test]
async fn test_delete_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::in_directory(dir.path(), CountingGenerator::new());

    let err = store.delete(&json!("never stored")).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_after_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::in_directory(dir.path(), CountingGenerator::new());

    let keys: Vec<Value> = (0..5).map(|i| json!({"n": i})).collect();
    for key in &keys {
        store.get(key).await.unwrap();
    }
    store.delete(&keys[2]).await.unwrap();

    let before = Utc::now() - chrono::Duration::minutes(1);
    let mut seen = Vec::new();
    let count = store
        .list(|key, value, entry| {
            assert_eq!(value["generated"], *key);
            assert!(entry.last_retrieved > before);
            seen.push(canonicalize(key));
        })
        .await
        .unwrap();
    seen.sort();

    let mut expected: Vec<String> = keys
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, k)| canonicalize(k))
        .collect();
    expected.sort();

    assert_eq!(count, 4);
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_read_touches_entry_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::in_directory(dir.path(), CountingGenerator::new());
    let key = json!("touched");

    store.get(&key).await.unwrap();

    let file = FileBackend::new(dir.path())
        .locate(&canonicalize(&key))
        .entry_file;
    let past = SystemTime::now() - Duration::from_secs(3600);
    std::fs::OpenOptions::new()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(past)
        .unwrap();

    let mut stale = Vec::new();
    store
        .list(|_, _, entry: &Entry| stale.push(entry.last_retrieved))
        .await
        .unwrap();
    assert!(stale[0] < Utc::now() - chrono::Duration::minutes(30));

    let before = SystemTime::now() - Duration::from_secs(5);
    let hit = store.get(&key).await.unwrap();
    assert!(hit.was_cached);

    let modified = std::fs::metadata(&file).unwrap().modified().unwrap();
    assert!(modified >= before);

    let mut fresh = Vec::new();
    store
        .list(|_, _, entry: &Entry| fresh.push(entry.last_retrieved))
        .await
        .unwrap();
    assert!(fresh[0] > Utc::now() - chrono::Duration::seconds(10));
}

#[tokio::test]
async fn test_failed_generation_is_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let store = ResourceStore::in_directory(dir.path(), move |key: Value, _ctx: GenerationContext| {
        let call = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if call == 0 {
                Err(AppError::generation("renderer unavailable"))
            } else {
                Ok::<_, AppError>(json!({"rendered": key}))
            }
        }
    });
    let key = json!({"page": 1});

    let err = store.get(&key).await.unwrap_err();
    assert_eq!(err.message, "renderer unavailable");
    assert_eq!(store.list(|_, _, _| {}).await.unwrap(), 0);

    let entry = store.get(&key).await.unwrap();
    assert!(!entry.was_cached);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.get(&key).await.unwrap().was_cached);
}

#[tokio::test]
async fn test_generator_sibling_files_are_not_listed() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::in_directory(dir.path(), |_key: Value, ctx: GenerationContext| async move {
        let base = ctx.storage_path().unwrap_or_default().to_string();
        let artifact = format!("{base}.png");
        tokio::fs::write(&artifact, b"not really a png").await?;
        Ok::<_, AppError>(json!({"artifact": artifact}))
    });

    let entry = store.get(&json!({"thumb": "a"})).await.unwrap();
    let artifact = entry.value["artifact"].as_str().unwrap().to_string();
    assert!(std::path::Path::new(&artifact).is_file());

    assert_eq!(store.list(|_, _, _| {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_entries_survive_a_new_store() {
    let dir = tempfile::tempdir().unwrap();
    let key = json!(["persisted", 1]);

    let first = CountingGenerator::new();
    ResourceStore::in_directory(dir.path(), first.clone())
        .get(&key)
        .await
        .unwrap();

    let second = CountingGenerator::new();
    let entry = ResourceStore::in_directory(dir.path(), second.clone())
        .get(&key)
        .await
        .unwrap();

    assert!(entry.was_cached);
    assert_eq!(entry.value["call"], json!(1));
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn test_empty_store_lists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResourceStore::in_directory(dir.path().join("missing"), CountingGenerator::new());

    let mut visited = 0;
    let count = store.list(|_, _, _| visited += 1).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(visited, 0);
}
