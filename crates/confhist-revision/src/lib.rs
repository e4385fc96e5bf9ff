//! Confhist Revision Vocabulary
//!
//! Strongly typed building blocks shared by the history store and its callers.
//!
//! # Core Concepts
//!
//! - [`RevisionId`]: Fixed-width timestamp naming one revision directory
//! - [`EntityRef`]: Kind plus logical path of a configuration-bearing entity
//! - [`HistoryDescriptor`]: Operator, operation and timestamp of a revision
//! - [`ConfigSnapshot`]: Opaque configuration payload with its file name
//!
//! # Example
//!
//! ```rust,ignore
//! use confhist_revision::{EntityRef, Operation, Operator, RevisionId, HistoryDescriptor};
//!
//! let job = EntityRef::job("team/build")?;
//! let id = RevisionId::from_instant(chrono::Utc::now());
//! let descr = HistoryDescriptor::new(&Operator::anonymous(), Operation::Changed, &id);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod descriptor;
mod entity;
mod id;
mod path;
mod snapshot;

pub use descriptor::{HistoryDescriptor, Operation, Operator, RenameRecord, ANONYMOUS_ID, ANONYMOUS_NAME};
pub use entity::{EntityKind, EntityRef};
pub use id::{RevisionId, RevisionIdError, ID_FORMAT, ID_WIDTH};
pub use path::{EntityPath, PathError};
pub use snapshot::{is_config_file_name, ConfigSnapshot, SnapshotError, SnapshotSource};

/// Descriptor file name inside every revision directory
pub const HISTORY_FILE: &str = "history.json";

/// Extension of configuration payload files
pub const CONFIG_EXTENSION: &str = "xml";

/// Payload name for entities without a configuration file of their own
pub const NODE_CONFIG_FILE: &str = "config.xml";

/// Token separating an entity name from its retirement timestamp
pub const DELETED_MARKER: &str = "_deleted_";

/// `chrono` format of the retirement timestamp suffix
pub const DELETED_SUFFIX_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Namespace directory holding item histories
pub const JOBS_DIR: &str = "jobs";

/// Namespace directory holding node histories
pub const NODES_DIR: &str = "nodes";

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn descriptor_for_entity_revision() {
        let job = EntityRef::job("team/build").unwrap();
        let id = RevisionId::parse("2026-01-02_03-04-05_006").unwrap();
        let descr = HistoryDescriptor::new(&Operator::new("Alice", "alice"), Operation::Changed, &id);

        assert_eq!(job.name(), "build");
        assert_eq!(descr.revision_id().unwrap(), id);
        assert_eq!(descr.operator().id, "alice");
    }

    #[test]
    fn marker_cannot_collide_with_revision_names() {
        let retired = format!("build{DELETED_MARKER}20260102_030405_006");
        assert!(!RevisionId::is_revision_name(&retired));
        assert!(EntityRef::job(&retired).is_err());
    }
}
