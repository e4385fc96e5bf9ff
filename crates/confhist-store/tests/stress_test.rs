//! Concurrent writers on one entity
//!
//! Run with: cargo test --package confhist-store --test stress_test

use confhist_revision::EntityRef;
use confhist_store::{HistoryStore, RetryPolicy, StoreConfig};
use confhist_test_utils::{alice, config_xml, JitterClock};
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const WRITERS: usize = 24;

fn stress_store(dir: &std::path::Path) -> Arc<HistoryStore> {
    let config = StoreConfig::new(dir)
        .with_skip_duplicates(false)
        .with_retry(RetryPolicy::new(Duration::from_millis(1), 2_000));
    Arc::new(HistoryStore::new(config).with_clock(Arc::new(JitterClock::new())))
}

#[test]
fn stress_test_same_entity_distinct_revisions() {
    let dir = tempfile::tempdir().unwrap();
    let store = stress_store(dir.path());
    let job = EntityRef::job("team/hot").unwrap();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let job = job.clone();
            thread::spawn(move || {
                barrier.wait();
                store
                    .on_entity_saved(&job, &config_xml(&format!("<writer>{i}</writer>")), &alice())
                    .expect("concurrent save should succeed")
                    .revision()
                    .cloned()
                    .expect("duplicates are not suppressed")
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let unique: BTreeSet<_> = ids.iter().cloned().collect();
    assert_eq!(unique.len(), WRITERS, "two writers shared a revision id");

    let listed = store.list_revision_ids(&job);
    assert_eq!(listed.len(), WRITERS);
    for id in &ids {
        assert!(store.revision_exists(&job, id));
        let payload = store.read_revision(&job, id).unwrap().unwrap();
        assert!(String::from_utf8(payload).unwrap().contains("<writer>"));
    }
}

#[test]
fn stress_test_independent_entities() {
    let dir = tempfile::tempdir().unwrap();
    let store = stress_store(dir.path());
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let job = EntityRef::job(&format!("job-{i}")).unwrap();
                barrier.wait();
                for n in 0..3 {
                    store
                        .on_entity_saved(&job, &config_xml(&format!("<n>{n}</n>")), &alice())
                        .unwrap();
                }
                job
            })
        })
        .collect();

    for handle in handles {
        let job = handle.join().unwrap();
        assert_eq!(store.list_revision_ids(&job).len(), 3);
    }
}
