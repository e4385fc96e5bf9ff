//! Duplicate detection against the latest revision

use crate::index::{list_revision_ids, resolve_snapshot};
use confhist_revision::ConfigSnapshot;
use std::path::Path;
use tracing::warn;

/// Check whether `pending` equals the payload of the newest revision
///
/// Compares bytes exactly. No history, a newest revision without payload, or
/// any read failure all answer `false`, so a save is never lost to an error.
#[must_use]
pub fn is_duplicate(history_root: &Path, pending: &ConfigSnapshot) -> bool {
    let Some(latest) = list_revision_ids(history_root).pop() else {
        return false;
    };
    let Some(stored_path) = resolve_snapshot(history_root, &latest) else {
        return false;
    };

    let stored = match std::fs::read(&stored_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %stored_path.display(), error = %e, "cannot read latest revision, treating save as new");
            return false;
        }
    };
    match pending.read_all() {
        Ok(bytes) => bytes == stored,
        Err(e) => {
            warn!(file = pending.file_name(), error = %e, "cannot read pending snapshot, treating save as new");
            false
        }
    }
}
