//! Integration tests for the document identity store
//!
//! These tests open real SQLite databases in temporary directories and
//! exercise restart, concurrency, and shared-backend behavior.

use crawl_admission::config::StorageConfig;
use crawl_admission::{DocumentIdentityStore, FrontierError};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn storage_config(dir: &TempDir, resumable: bool) -> StorageConfig {
    StorageConfig {
        location: dir.path().join("frontier"),
        resumable_crawling: resumable,
    }
}

#[test]
fn test_literal_assignment_scenario() {
    let dir = TempDir::new().unwrap();
    let store = DocumentIdentityStore::open(&storage_config(&dir, true)).unwrap();

    assert_eq!(store.assign_if_absent("http://a.com/").unwrap().as_str(), "1");
    assert_eq!(store.assign_if_absent("http://a.com/").unwrap().as_str(), "1");
    assert_eq!(store.assign_if_absent("http://b.com/").unwrap().as_str(), "2");
    assert_eq!(store.count().unwrap(), 2);

    store.close().unwrap();
}

#[test]
fn test_persistence_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = storage_config(&dir, true);
    let urls: Vec<String> = (0..25)
        .map(|i| format!("https://site{}.example/page/{}", i % 5, i))
        .collect();

    let assigned: Vec<String> = {
        let store = DocumentIdentityStore::open(&config).unwrap();
        let ids = urls
            .iter()
            .map(|url| store.assign_if_absent(url).unwrap().to_string())
            .collect();
        store.close().unwrap();
        ids
    };

    let store = DocumentIdentityStore::open(&config).unwrap();
    assert_eq!(store.count().unwrap(), urls.len() as u64);
    assert_eq!(store.last_doc_id(), urls.len() as u64);

    for (url, id) in urls.iter().zip(&assigned) {
        let found = store.lookup(url).unwrap().expect("identity lost on restart");
        assert_eq!(found.as_str(), id);
    }

    // Generation resumes after the restored ids rather than reusing them.
    let next = store.assign_if_absent("https://fresh.example/").unwrap();
    assert_eq!(next.as_str(), "26");
}

#[test]
fn test_drop_without_close_keeps_assignments() {
    let dir = TempDir::new().unwrap();
    let config = storage_config(&dir, true);

    {
        let store = DocumentIdentityStore::open(&config).unwrap();
        store.assign_if_absent("http://a.com/").unwrap();
    }

    let store = DocumentIdentityStore::open(&config).unwrap();
    assert!(store.lookup("http://a.com/").unwrap().is_some());
}

#[test]
fn test_non_resumable_reopen_starts_empty() {
    let dir = TempDir::new().unwrap();
    let config = storage_config(&dir, false);

    {
        let store = DocumentIdentityStore::open(&config).unwrap();
        store.assign_if_absent("http://a.com/").unwrap();
        store.close().unwrap();
    }

    let store = DocumentIdentityStore::open(&config).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert!(!store.is_seen_before("http://a.com/").unwrap());
}

#[test]
fn test_concurrent_assign_same_url() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DocumentIdentityStore::open(&storage_config(&dir, true)).unwrap());
    let workers = 16;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.assign_if_absent("http://contended.com/").unwrap()
            })
        })
        .collect();

    let ids: HashSet<String> = handles
        .into_iter()
        .map(|h| h.join().unwrap().to_string())
        .collect();

    assert_eq!(ids.len(), 1);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_concurrent_assign_distinct_urls_are_unique() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(DocumentIdentityStore::open(&storage_config(&dir, true)).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..20)
                    .map(|i| {
                        store
                            .assign_if_absent(&format!("http://w{}.com/{}", worker, i))
                            .unwrap()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: HashSet<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(ids.len(), 160);
    assert_eq!(store.count().unwrap(), 160);
}

#[test]
fn test_two_stores_sharing_one_database() {
    let dir = TempDir::new().unwrap();
    let config = storage_config(&dir, true);

    // Both open before either writes, so both counters start at zero.
    let first = DocumentIdentityStore::open(&config).unwrap();
    let second = DocumentIdentityStore::open(&config).unwrap();

    let a = first.assign_if_absent("http://a.com/").unwrap();
    let b = second.assign_if_absent("http://b.com/").unwrap();
    assert_eq!(a.as_str(), "1");
    assert_eq!(b.as_str(), "2");

    assert_eq!(second.assign_if_absent("http://a.com/").unwrap(), a);
    assert_eq!(first.lookup("http://b.com/").unwrap(), Some(b));
}

#[test]
fn test_assign_explicit_scenario() {
    let dir = TempDir::new().unwrap();
    let store = DocumentIdentityStore::open(&storage_config(&dir, true)).unwrap();

    store.assign_explicit("http://x/", "A").unwrap();

    let conflict = store.assign_explicit("http://x/", "B");
    assert!(matches!(conflict, Err(FrontierError::Conflict { .. })));

    store.assign_explicit("http://x/", "A").unwrap();
    assert_eq!(store.lookup("http://x/").unwrap().unwrap().as_str(), "A");
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_export_then_import_into_fresh_store() {
    let source_dir = TempDir::new().unwrap();
    let target_dir = TempDir::new().unwrap();

    let source = DocumentIdentityStore::open(&storage_config(&source_dir, true)).unwrap();
    source.assign_if_absent("http://a.com/").unwrap();
    source.assign_if_absent("http://b.com/").unwrap();
    let exported = source.identities().unwrap();

    let target = DocumentIdentityStore::open(&storage_config(&target_dir, true)).unwrap();
    for identity in &exported {
        target
            .assign_explicit(&identity.canonical_url, identity.doc_id.as_str())
            .unwrap();
    }

    assert_eq!(target.count().unwrap(), 2);
    assert_eq!(
        target.lookup("http://b.com/").unwrap(),
        source.lookup("http://b.com/").unwrap()
    );
    // Imported ids occupy 1 and 2; the counter resumed at 0 skips past them.
    assert_eq!(target.assign_if_absent("http://c.com/").unwrap().as_str(), "3");
}

#[test]
fn test_storage_unavailable_on_bad_location() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let config = StorageConfig {
        location: blocker,
        resumable_crawling: true,
    };

    let result = DocumentIdentityStore::open(&config);
    assert!(matches!(
        result,
        Err(FrontierError::StorageUnavailable { .. })
    ));
}
