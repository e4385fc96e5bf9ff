//! Retention enforcement
//!
//! Runs before allocation, so the cap is applied to the state before the new
//! revision exists. "Created" revisions are never removed but count toward the
//! budget.

use crate::index::{list_revision_ids, load_descriptor};
use confhist_revision::{Operation, RevisionId};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What one purge pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    /// Revisions deleted, newest first
    pub removed: Vec<RevisionId>,
    /// Origin revisions kept although they were beyond the cap
    pub retained_created: Vec<RevisionId>,
    /// Revisions that could not be deleted, retried next pass
    pub failures: Vec<PurgeFailure>,
}

impl PurgeReport {
    /// Check if the pass changed nothing and hit no errors
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.failures.is_empty()
    }
}

/// A revision left behind by purge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeFailure {
    /// Revision that stayed
    pub revision: RevisionId,
    /// Its directory
    pub path: PathBuf,
    /// Underlying IO error, rendered
    pub message: String,
}

/// Trim `history_root` so a following write leaves at most `max_entries`
///
/// `max_entries == 0` disables the cap.
#[must_use]
pub fn purge(history_root: &Path, max_entries: u32) -> PurgeReport {
    let mut report = PurgeReport::default();
    if max_entries == 0 {
        return report;
    }
    let budget = (max_entries - 1) as usize;

    let mut ids = list_revision_ids(history_root);
    if ids.len() <= budget {
        return report;
    }
    ids.reverse();

    // An unreadable descriptor is not evidence of an origin revision.
    let (created, rest): (Vec<RevisionId>, Vec<RevisionId>) = ids.into_iter().partition(|id| {
        load_descriptor(&history_root.join(id.as_str()))
            .is_ok_and(|d| d.operation == Operation::Created)
    });
    let keep = budget.saturating_sub(created.len());
    if created.len() > budget {
        report.retained_created = created;
    }

    for id in rest.into_iter().skip(keep) {
        let dir = history_root.join(id.as_str());
        match remove_revision_dir(&dir) {
            Ok(()) => {
                debug!(revision = %id, root = %history_root.display(), "purged revision");
                report.removed.push(id);
            }
            Err(e) => {
                warn!(revision = %id, error = %e, "failed to purge revision, will retry");
                report.failures.push(PurgeFailure {
                    revision: id,
                    path: dir,
                    message: e.to_string(),
                });
            }
        }
    }
    report
}

/// Delete the files of a revision, then the directory itself
fn remove_revision_dir(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
        }
    }
    std::fs::remove_dir(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_revision;
    use confhist_revision::{HistoryDescriptor, Operator};

    fn rev(n: u32) -> String {
        format!("2026-01-01_00-00-{n:02}_000")
    }

    fn put(root: &Path, n: u32, op: Operation) {
        let id = RevisionId::parse(&rev(n)).unwrap();
        let dir = root.join(id.as_str());
        std::fs::create_dir_all(&dir).unwrap();
        write_revision(&dir, &HistoryDescriptor::new(&Operator::anonymous(), op, &id), None).unwrap();
    }

    fn remaining(root: &Path) -> Vec<String> {
        list_revision_ids(root).iter().map(|id| id.as_str().to_string()).collect()
    }

    #[test]
    fn zero_cap_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        for n in 0..5 {
            put(dir.path(), n, Operation::Changed);
        }
        assert!(purge(dir.path(), 0).is_noop());
        assert_eq!(remaining(dir.path()).len(), 5);
    }

    #[test]
    fn keeps_room_for_next_write() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), 0, Operation::Created);
        for n in 1..6 {
            put(dir.path(), n, Operation::Changed);
        }

        let report = purge(dir.path(), 3);
        assert_eq!(remaining(dir.path()), [rev(0), rev(5)]);
        assert_eq!(report.removed.len(), 4);
        assert!(report.retained_created.is_empty());
    }

    #[test]
    fn created_survives_cap_of_one() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), 0, Operation::Created);
        put(dir.path(), 1, Operation::Changed);

        let report = purge(dir.path(), 1);
        assert_eq!(remaining(dir.path()), [rev(0)]);
        assert_eq!(report.retained_created.len(), 1);
    }

    #[test]
    fn under_budget_untouched() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), 0, Operation::Created);
        put(dir.path(), 1, Operation::Changed);
        assert!(purge(dir.path(), 3).is_noop());
        assert_eq!(remaining(dir.path()).len(), 2);
    }

    #[test]
    fn unreadable_descriptor_counts_as_ordinary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(rev(0))).unwrap();
        put(dir.path(), 1, Operation::Changed);
        put(dir.path(), 2, Operation::Changed);

        let report = purge(dir.path(), 2);
        assert_eq!(remaining(dir.path()), [rev(2)]);
        assert_eq!(report.removed.len(), 2);
    }

    #[test]
    fn non_revision_dirs_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("jobs").join("child")).unwrap();
        for n in 0..4 {
            put(dir.path(), n, Operation::Changed);
        }
        let _ = purge(dir.path(), 2);
        assert!(dir.path().join("jobs").join("child").is_dir());
        assert_eq!(remaining(dir.path()), [rev(3)]);
    }
}
