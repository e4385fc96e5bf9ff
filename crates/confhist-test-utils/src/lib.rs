//! Testing utilities for the confhist workspace
//!
//! Shared fixtures: a store over a temporary directory driven by a manual
//! clock, a jittering clock for concurrency tests, and a recording mirror.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use confhist_revision::{ConfigSnapshot, EntityRef, Operator, RevisionId};
use confhist_store::{Clock, HistoryStore, ManualClock, Mirror, MirrorError, StoreConfig, SystemClock};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Fixed start instant of every [`TestHistory`]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

/// Store over a temporary directory with a manual clock
pub struct TestHistory {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub store: HistoryStore,
}

impl TestHistory {
    /// Unlimited history, duplicate suppression on
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// History with a retention cap
    pub fn with_max_entries(max: u32) -> Self {
        Self::with_config(|config| config.with_max_entries(max))
    }

    /// History with a customized configuration
    pub fn with_config(customize: impl FnOnce(StoreConfig) -> StoreConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(epoch()));
        let config = customize(StoreConfig::new(dir.path().join("config-history")));
        let store = HistoryStore::new(config).with_clock(clock.clone());
        Self { dir, clock, store }
    }

    /// History base directory
    pub fn base(&self) -> PathBuf {
        self.store.layout().base().to_path_buf()
    }

    /// Move the clock forward one second
    pub fn tick(&self) {
        self.clock.advance(Duration::from_secs(1));
    }

    /// Save `body` as a changed revision and advance the clock
    pub fn save(&self, entity: &EntityRef, body: &str) -> Option<RevisionId> {
        let outcome = self.store.on_entity_saved(entity, &config_xml(body), &alice()).unwrap();
        self.tick();
        outcome.revision().cloned()
    }

    /// Record the created revision and advance the clock
    pub fn create(&self, entity: &EntityRef, body: &str) -> RevisionId {
        let id = self.store.on_entity_created(entity, &config_xml(body), &alice()).unwrap();
        self.tick();
        id
    }
}

impl Default for TestHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `config.xml` snapshot wrapping `body` in a project element
pub fn config_xml(body: &str) -> ConfigSnapshot {
    let xml = format!("<?xml version='1.1' encoding='UTF-8'?>\n<project>{body}</project>\n");
    ConfigSnapshot::from_bytes("config.xml", xml.into_bytes()).unwrap()
}

/// A named operator
pub fn alice() -> Operator {
    Operator::new("Alice Example", "alice")
}

/// Wall clock that stalls a little before each sample
///
/// Writers that start together drift apart by a few milliseconds, which is
/// how clashes and their resolution show up in practice.
#[derive(Debug, Default)]
pub struct JitterClock {
    calls: AtomicU64,
}

impl JitterClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for JitterClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(Duration::from_micros((n * 7919) % 3000));
        SystemClock.now()
    }

    fn sleep(&self, duration: Duration) {
        SystemClock.sleep(duration);
    }
}

/// Mirror remembering every publish call
#[derive(Debug, Default)]
pub struct RecordingMirror {
    published: Mutex<Vec<(EntityRef, PathBuf, RevisionId)>>,
    fail: bool,
}

impl RecordingMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror that records and then rejects
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<(EntityRef, PathBuf, RevisionId)> {
        self.published.lock().clone()
    }
}

impl Mirror for RecordingMirror {
    fn publish(&self, entity: &EntityRef, history_root: &Path, revision: &RevisionId) -> Result<(), MirrorError> {
        self.published
            .lock()
            .push((entity.clone(), history_root.to_path_buf(), revision.clone()));
        if self.fail {
            return Err(MirrorError::Rejected {
                revision: revision.to_string(),
                message: "remote unavailable".into(),
            });
        }
        Ok(())
    }
}
