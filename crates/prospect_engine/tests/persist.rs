use std::fs;

use prospect_engine::{ensure_output_dir, sanitize_file_stem, PersistError, ResultStore};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn save_replaces_previous_snapshot() {
    let temp = TempDir::new().unwrap();
    let store = ResultStore::new(temp.path().to_path_buf(), "ron");

    let first = store.save("job-1", "first").unwrap();
    assert_eq!(first.file_name().unwrap(), "job-1.ron");
    let second = store.save("job-1", "second").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "second");
    assert_eq!(store.load("job-1").unwrap(), "second");
}

#[test]
fn list_returns_sorted_stems_of_matching_files() {
    let temp = TempDir::new().unwrap();
    let store = ResultStore::new(temp.path().to_path_buf(), "ron");
    store.save("b", "x").unwrap();
    store.save("a", "x").unwrap();
    fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

    assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn missing_snapshot_is_not_found() {
    let temp = TempDir::new().unwrap();
    let store = ResultStore::new(temp.path().join("never-created"), "ron");
    assert!(store.list().unwrap().is_empty());
    assert!(matches!(store.load("nope"), Err(PersistError::NotFound(_))));
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let store = ResultStore::new(file_path.clone(), "ron");
    assert!(store.save("job", "data").is_err());
    assert!(!file_path.with_file_name("job.ron").exists());
}

#[test]
fn job_ids_become_safe_file_stems() {
    assert_eq!(sanitize_file_stem("abc-123_x"), "abc-123_x");
    assert_eq!(sanitize_file_stem("../etc/passwd"), "___etc_passwd");
    assert_eq!(sanitize_file_stem("  "), "job");
}
