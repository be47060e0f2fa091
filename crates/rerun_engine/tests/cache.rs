use std::fs;
use std::sync::Arc;

use rerun_engine::{CacheError, ScriptCache};
use tempfile::TempDir;

#[test]
fn load_reads_once_until_invalidated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("app.sh");
    fs::write(&path, "echo one\n").unwrap();

    let cache = ScriptCache::new();
    let first = cache.load(&path).unwrap();
    fs::write(&path, "echo two\n").unwrap();
    let cached = cache.load(&path).unwrap();

    assert!(Arc::ptr_eq(&first, &cached));
    assert_eq!(&*cached, "echo one\n");

    cache.invalidate_all();
    assert!(!cache.contains(&path));
    assert_eq!(&*cache.load(&path).unwrap(), "echo two\n");
}

#[test]
fn generation_counts_invalidations() {
    let cache = ScriptCache::new();
    assert_eq!(cache.generation(), 0);
    cache.invalidate_all();
    cache.invalidate_all();
    assert_eq!(cache.generation(), 2);
}

#[test]
fn clones_share_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("app.sh");
    fs::write(&path, "true\n").unwrap();

    let cache = ScriptCache::new();
    let other = cache.clone();
    cache.load(&path).unwrap();
    assert_eq!(other.len(), 1);

    other.invalidate_all();
    assert!(cache.is_empty());
}

#[test]
fn missing_file_is_a_read_error() {
    let temp = TempDir::new().unwrap();
    let err = ScriptCache::new()
        .load(&temp.path().join("nope.sh"))
        .unwrap_err();
    assert!(matches!(err, CacheError::Read { .. }));
}
