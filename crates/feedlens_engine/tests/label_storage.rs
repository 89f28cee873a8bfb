use std::sync::Arc;

use feedlens_engine::{
    JsonFileStore, KeyValueStore, LabelSet, LabelStore, StorageError, LABELS_KEY,
};
use pretty_assertions::assert_eq;

fn file_store(dir: &tempfile::TempDir) -> Arc<JsonFileStore> {
    Arc::new(JsonFileStore::new(dir.path().join("store").join("feedlens.json")))
}

#[test]
fn missing_file_means_no_labels() {
    let dir = tempfile::tempdir().unwrap();
    let labels = LabelStore::new(file_store(&dir));
    assert!(labels.load().unwrap().is_empty());
}

#[test]
fn labels_survive_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let labels = LabelStore::new(file_store(&dir));
    assert!(labels.add("rust").unwrap());
    assert!(labels.add("  intelligence artificielle ").unwrap());

    let reopened = LabelStore::new(file_store(&dir));
    assert_eq!(
        reopened.load().unwrap(),
        LabelSet::new(["rust", "intelligence artificielle"])
    );
}

#[test]
fn duplicates_and_blanks_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let labels = LabelStore::new(file_store(&dir));
    assert!(labels.add("rust").unwrap());
    assert!(!labels.add("rust").unwrap());
    assert!(!labels.add("   ").unwrap());
    assert_eq!(labels.load().unwrap().len(), 1);
}

#[test]
fn removing_unknown_label_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let labels = LabelStore::new(file_store(&dir));
    labels.add("rust").unwrap();

    assert!(!labels.remove("go").unwrap());
    assert!(labels.remove("rust").unwrap());
    assert!(labels.load().unwrap().is_empty());
}

#[test]
fn labels_are_stored_as_a_json_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);
    LabelStore::new(store.clone())
        .save(&LabelSet::new(["a", "b"]))
        .unwrap();

    assert_eq!(store.get(LABELS_KEY).unwrap().as_deref(), Some(r#"["a","b"]"#));
}

#[test]
fn other_keys_are_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);
    store.set("theme", "dark").unwrap();
    LabelStore::new(store.clone()).add("rust").unwrap();

    assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
}

#[test]
fn corrupt_label_value_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = file_store(&dir);
    store.set(LABELS_KEY, "{not a list").unwrap();

    let err = LabelStore::new(store).load().unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }));
}
