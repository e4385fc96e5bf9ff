//! Revision index and reader
//!
//! Listing is two-phase: [`RevisionListing::scan`] only reads directory names,
//! descriptors are parsed when a caller asks for one.

use crate::error::ReadError;
use crate::layout::child_dirs;
use confhist_revision::{is_config_file_name, HistoryDescriptor, RevisionId, HISTORY_FILE};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Sorted revision ids of one history root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionListing {
    root: PathBuf,
    ids: Vec<RevisionId>,
}

impl RevisionListing {
    /// Scan `root` for revision directories, ascending by id
    ///
    /// A missing root is an empty history.
    #[must_use]
    pub fn scan(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let ids = list_revision_ids(&root);
        Self { root, ids }
    }

    /// History root that was scanned
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Revision ids, ascending
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[RevisionId] {
        &self.ids
    }

    /// Number of revisions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if there is no history
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Most recent revision
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&RevisionId> {
        self.ids.last()
    }

    /// Check whether `id` was listed
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &RevisionId) -> bool {
        self.ids.binary_search(id).is_ok()
    }

    /// Parse one revision's descriptor
    ///
    /// # Errors
    /// Returns error if the descriptor is missing or unreadable
    pub fn descriptor(&self, id: &RevisionId) -> Result<HistoryDescriptor, ReadError> {
        load_descriptor(&self.root.join(id.as_str()))
    }

    /// Lazily parsed `(id, descriptor)` pairs, ascending
    pub fn entries(&self) -> impl Iterator<Item = (&RevisionId, Result<HistoryDescriptor, ReadError>)> + '_ {
        self.ids.iter().map(move |id| (id, self.descriptor(id)))
    }

    /// Parse every descriptor, omitting unusable entries
    #[must_use]
    pub fn load_all(&self) -> BTreeMap<RevisionId, HistoryDescriptor> {
        self.entries()
            .filter_map(|(id, descr)| match descr {
                Ok(descr) => Some((id.clone(), descr)),
                Err(e) => {
                    tracing::debug!(revision = %id, error = %e, "skipping unreadable revision");
                    None
                }
            })
            .collect()
    }

    /// Payload of one revision
    #[must_use]
    pub fn snapshot_path(&self, id: &RevisionId) -> Option<PathBuf> {
        resolve_snapshot(&self.root, id)
    }

    /// Most recent revision that carries a payload
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<(RevisionId, PathBuf)> {
        self.ids
            .iter()
            .rev()
            .find_map(|id| self.snapshot_path(id).map(|path| (id.clone(), path)))
    }
}

/// Revision ids under `root`, ascending; missing root yields none
#[must_use]
pub fn list_revision_ids(root: &Path) -> Vec<RevisionId> {
    // child_dirs sorts names, and id order is name order.
    child_dirs(root)
        .iter()
        .filter_map(|name| RevisionId::parse(name).ok())
        .collect()
}

/// Parse the descriptor inside a revision directory
///
/// # Errors
/// - `ReadError::NotFound` if there is no descriptor
/// - `ReadError::Io` / `ReadError::Descriptor` if it cannot be read or parsed
pub fn load_descriptor(revision_dir: &Path) -> Result<HistoryDescriptor, ReadError> {
    let path = revision_dir.join(HISTORY_FILE);
    let text = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ReadError::NotFound(path.clone())
        } else {
            ReadError::io_error(&path, e)
        }
    })?;
    serde_json::from_str(&text).map_err(|source| ReadError::Descriptor { path, source })
}

/// Locate the payload of revision `id` under `root`
///
/// The payload is the non-descriptor file with the configuration extension.
/// Absence of the revision or of a payload is `None`, not an error.
#[must_use]
pub fn resolve_snapshot(root: &Path, id: &RevisionId) -> Option<PathBuf> {
    let dir = root.join(id.as_str());
    let entries = std::fs::read_dir(&dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter(|e| e.file_name().to_str().is_some_and(is_config_file_name))
        .map(|e| e.path())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Read the payload of revision `id` under `root`
///
/// # Errors
/// Returns error if the payload exists but cannot be read
pub fn read_snapshot(root: &Path, id: &RevisionId) -> Result<Option<Vec<u8>>, ReadError> {
    match resolve_snapshot(root, id) {
        Some(path) => std::fs::read(&path)
            .map(Some)
            .map_err(|e| ReadError::io_error(path, e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::write_revision;
    use confhist_revision::{ConfigSnapshot, Operation, Operator};

    fn id(s: &str) -> RevisionId {
        RevisionId::parse(s).unwrap()
    }

    fn put(root: &Path, rev: &str, op: Operation, payload: Option<&str>) {
        let rid = id(rev);
        let dir = root.join(rev);
        std::fs::create_dir_all(&dir).unwrap();
        let snap = payload.map(|p| ConfigSnapshot::from_bytes("config.xml", p.as_bytes().to_vec()).unwrap());
        write_revision(&dir, &HistoryDescriptor::new(&Operator::anonymous(), op, &rid), snap.as_ref()).unwrap();
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let listing = RevisionListing::scan(dir.path().join("nothing"));
        assert!(listing.is_empty());
        assert!(listing.latest().is_none());
    }

    #[test]
    fn lists_only_revision_dirs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "2026-01-02_00-00-00_000", Operation::Changed, Some("b"));
        put(dir.path(), "2026-01-01_00-00-00_000", Operation::Created, Some("a"));
        std::fs::create_dir(dir.path().join("jobs")).unwrap();
        std::fs::write(dir.path().join("stray.xml"), b"x").unwrap();

        let listing = RevisionListing::scan(dir.path());
        let names: Vec<_> = listing.ids().iter().map(RevisionId::as_str).collect();
        assert_eq!(names, ["2026-01-01_00-00-00_000", "2026-01-02_00-00-00_000"]);
        assert_eq!(listing.latest().unwrap().as_str(), "2026-01-02_00-00-00_000");
        assert_eq!(
            listing.descriptor(&id("2026-01-01_00-00-00_000")).unwrap().operation,
            Operation::Created
        );
    }

    #[test]
    fn unreadable_descriptor_is_omitted() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "2026-01-01_00-00-00_000", Operation::Created, Some("a"));
        let broken = dir.path().join("2026-01-02_00-00-00_000");
        std::fs::create_dir(&broken).unwrap();
        std::fs::write(broken.join(HISTORY_FILE), b"{ not json").unwrap();

        let listing = RevisionListing::scan(dir.path());
        assert_eq!(listing.len(), 2);
        assert!(matches!(
            listing.descriptor(&id("2026-01-02_00-00-00_000")),
            Err(ReadError::Descriptor { .. })
        ));
        assert_eq!(listing.load_all().len(), 1);
    }

    #[test]
    fn resolves_payload_not_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        put(dir.path(), "2026-01-01_00-00-00_000", Operation::Created, Some("<a/>"));
        put(dir.path(), "2026-01-02_00-00-00_000", Operation::Deleted, None);

        let with = id("2026-01-01_00-00-00_000");
        let without = id("2026-01-02_00-00-00_000");
        assert!(resolve_snapshot(dir.path(), &with).unwrap().ends_with("config.xml"));
        assert!(resolve_snapshot(dir.path(), &without).is_none());
        assert!(resolve_snapshot(dir.path(), &id("2030-01-01_00-00-00_000")).is_none());
        assert_eq!(read_snapshot(dir.path(), &with).unwrap().unwrap(), b"<a/>");
        assert!(read_snapshot(dir.path(), &without).unwrap().is_none());

        let listing = RevisionListing::scan(dir.path());
        assert_eq!(listing.latest_snapshot().unwrap().0, with);
    }
}
