//! Confhist Store
//!
//! Filesystem-backed configuration history: every change to an entity's
//! configuration becomes an immutable, timestamp-named revision directory.
//!
//! # Core Operations
//!
//! - **Record**: created / changed / renamed / deleted revisions per entity
//! - **Retain**: purge the oldest revisions beyond a cap, never the origin
//! - **Read**: list revisions lazily and resolve one to its payload
//! - **Migrate**: relocate history on rename, retire it on delete
//!
//! # Architecture
//!
//! ```text
//! ConfigEvent → HistoryListener → HistoryStore ─┬→ purge → allocate → write → Mirror
//!                                               └→ RevisionListing → payload
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use confhist_store::prelude::*;
//!
//! let store = HistoryStore::new(StoreConfig::new("/var/lib/confhist").with_max_entries(20));
//! let job = EntityRef::job("team/build")?;
//! let op = Operator::new("Alice", "alice");
//!
//! store.on_entity_created(&job, &ConfigSnapshot::from_file("jobs/build/config.xml")?, &op)?;
//! for (id, descr) in store.list_revisions(&job).entries() {
//!     println!("{id} {:?}", descr.map(|d| d.operation));
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod allocator;
pub mod clock;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod index;
pub mod layout;
pub mod listener;
pub mod migration;
pub mod mirror;
pub mod purge;
pub mod store;
pub mod writer;

// Re-exports for convenience
pub use allocator::{AllocatedRevision, RevisionAllocator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RetryPolicy, StoreConfig, DEFAULT_EXCLUDE_PATTERN};
pub use error::{
    AllocationError, ConfigError, MigrationError, MirrorError, ReadError, StoreError, StoreResult, WriteError,
};
pub use index::RevisionListing;
pub use layout::{HistoryLayout, RetiredEntity};
pub use listener::{ConfigEvent, EventOutcome, HistoryListener, SaveFilter, SkipReason};
pub use migration::{DeleteOutcome, Relocation, RenameOutcome};
pub use mirror::{Mirror, NoMirror};
pub use purge::{PurgeFailure, PurgeReport};
pub use store::{HistoryStore, SaveOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for recording and reading history
    pub use crate::config::{RetryPolicy, StoreConfig};
    pub use crate::error::{ReadError, StoreError, StoreResult};
    pub use crate::listener::{ConfigEvent, EventOutcome, HistoryListener};
    pub use crate::store::{HistoryStore, SaveOutcome};
    pub use confhist_revision::{
        ConfigSnapshot, EntityKind, EntityPath, EntityRef, HistoryDescriptor, Operation, Operator, RevisionId,
    };
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use confhist_revision::{ConfigSnapshot, EntityKind, EntityPath, EntityRef, Operation, Operator};
    use std::sync::Arc;

    #[test]
    fn full_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()));
        let store = HistoryStore::new(StoreConfig::new(dir.path())).with_clock(clock.clone());
        let op = Operator::new("Alice", "alice");
        let a = EntityRef::job("team/a").unwrap();
        let snap = |b: &str| ConfigSnapshot::from_bytes("config.xml", b.as_bytes().to_vec()).unwrap();

        store.on_entity_created(&a, &snap("<v1/>"), &op).unwrap();
        clock.advance(std::time::Duration::from_secs(1));
        store.on_entity_saved(&a, &snap("<v2/>"), &op).unwrap();
        clock.advance(std::time::Duration::from_secs(1));

        let renamed = store.on_entity_renamed(&a, "a", "b", None, &op).unwrap();
        assert!(renamed.relocation.is_success());
        let b = a.with_name("b").unwrap();
        assert_eq!(store.list_revision_ids(&b).len(), 3);
        assert_eq!(store.read_revision(&b, &renamed.revision).unwrap().unwrap(), b"<v2/>");

        clock.advance(std::time::Duration::from_secs(1));
        let deleted = store.on_entity_deleted(&b, &op).unwrap();
        let retired_root = deleted.retired.unwrap();

        let folder: EntityPath = "team".parse().unwrap();
        assert!(store.list_entities_with_history(EntityKind::Job, &folder).is_empty());
        let retired = store.list_deleted_entities_with_history(EntityKind::Job, &folder);
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].name, "b");
        assert_eq!(retired[0].root, retired_root);

        let listing = store.retired_revisions(&retired[0]);
        let latest = listing.latest().unwrap();
        assert_eq!(listing.descriptor(latest).unwrap().operation, Operation::Deleted);
        assert_eq!(std::fs::read(listing.snapshot_path(latest).unwrap()).unwrap(), b"<v2/>");
    }
}
