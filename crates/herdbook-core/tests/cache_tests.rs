use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use herdbook_core::cache::{CacheStore, FileCacheStore, ManualClock};
use herdbook_core::{AnimalRecord, CacheKey, Direction, TreeCache, TreeGraph};

fn graph(root: u64, generated_secs: i64) -> TreeGraph {
    TreeGraph::new(AnimalRecord::new(root).with_code(format!("R-{}", root)), Direction::Ancestors)
        .with_node(AnimalRecord::new(2))
        .with_edge(2, root, "father")
        .with_depth(1)
        .with_generated_at(Utc.timestamp_opt(generated_secs, 0).unwrap())
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.timestamp_opt(50_000, 0).unwrap()))
}

#[test]
fn test_cache_key_normalization() {
    assert_eq!(
        CacheKey::new(Direction::Ancestors, 7, 3, "sex,id"),
        CacheKey::new(Direction::Ancestors, 7, 3, "id,sex")
    );
    assert_ne!(
        CacheKey::new(Direction::Ancestors, 7, 3, "id"),
        CacheKey::new(Direction::Descendants, 7, 3, "id")
    );
    assert_ne!(
        CacheKey::new(Direction::Ancestors, 7, 3, "id"),
        CacheKey::new(Direction::Ancestors, 7, 4, "id")
    );
}

#[test]
fn test_file_cache_survives_restart() {
    let temp = TempDir::new().unwrap();
    let clock = clock();
    let key = CacheKey::new(Direction::Ancestors, 5, 3, "id,sex");

    let first = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock.clone())
        .with_store(FileCacheStore::new(temp.path()));
    first.set(&key, graph(5, 100));

    let second = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock.clone())
        .with_store(FileCacheStore::new(temp.path()));
    let restored = second.get(&key).unwrap();
    assert_eq!(restored, graph(5, 100));
    assert_eq!(restored.root().and_then(|r| r.code()), Some("R-5"));

    clock.advance(Duration::from_secs(480));
    let third = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock.clone())
        .with_store(FileCacheStore::new(temp.path()));
    assert!(third.get(&key).is_none());
}

#[test]
fn test_expired_file_is_removed_on_read() {
    let temp = TempDir::new().unwrap();
    let clock = clock();
    let expired = CacheKey::new(Direction::Ancestors, 5, 3, "id");
    let live = CacheKey::new(Direction::Descendants, 6, 2, "id");

    let cache = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock.clone())
        .with_store(FileCacheStore::new(temp.path()));
    cache.set(&expired, graph(5, 100));
    clock.advance(Duration::from_secs(480));
    cache.set(&live, graph(6, 100));

    let restarted = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock.clone())
        .with_store(FileCacheStore::new(temp.path()));
    assert!(restarted.get(&expired).is_none());

    let store = FileCacheStore::new(temp.path());
    assert!(store.load(&expired.to_string()).unwrap().is_none());
    assert!(store.load(&live.to_string()).unwrap().is_some());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn test_replace_if_newer_updates_store() {
    let temp = TempDir::new().unwrap();
    let key = CacheKey::new(Direction::Ancestors, 5, 3, "id");
    let cache = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock())
        .with_store(FileCacheStore::new(temp.path()));

    cache.set(&key, graph(5, 100));
    assert!(cache.replace_if_newer(&key, graph(5, 200)));

    let stored = FileCacheStore::new(temp.path())
        .load(&key.to_string())
        .unwrap()
        .unwrap();
    assert_eq!(stored.graph.generated_at, graph(5, 200).generated_at);
}

#[test]
fn test_clear_removes_files() {
    let temp = TempDir::new().unwrap();
    let cache = TreeCache::new(Duration::from_secs(480))
        .with_clock(clock())
        .with_store(FileCacheStore::new(temp.path()));

    cache.set(&CacheKey::new(Direction::Ancestors, 5, 3, "id"), graph(5, 1));
    cache.set(&CacheKey::new(Direction::Descendants, 6, 2, "id"), graph(6, 1));
    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_concurrent_writers_keep_newest() {
    let cache = Arc::new(TreeCache::new(Duration::from_secs(480)).with_clock(clock()));
    let key = CacheKey::new(Direction::Ancestors, 5, 3, "id");
    cache.set(&key, graph(5, 0));

    let handles: Vec<_> = (1..=8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            std::thread::spawn(move || {
                cache.replace_if_newer(&key, graph(5, i * 10));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.get(&key).unwrap().generated_at, graph(5, 80).generated_at);
}
