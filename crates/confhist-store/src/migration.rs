//! Rename and delete bookkeeping for history roots
//!
//! Relocation is copy-then-remove rather than a move, because the old and new
//! roots may sit on different storage. Failures are returned as values; the
//! entity-level operation has already happened and history continuity is
//! best-effort.

use crate::error::MigrationError;
use confhist_revision::RevisionId;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Result of moving a history subtree
#[derive(Debug)]
pub enum Relocation {
    /// Old root did not exist
    NothingToMove,
    /// Old and new names resolve to the same directory; history left in place
    SameRoot,
    /// Subtree copied and old root removed
    Moved {
        /// Files copied
        files: usize,
        /// Files left alone because the destination already had them
        skipped: usize,
    },
    /// Relocation stopped; the old root, if still present, is intact
    Failed(MigrationError),
}

impl Relocation {
    /// Check if history reached the new root
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Failure, if any
    #[must_use]
    pub fn error(&self) -> Option<&MigrationError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of recording a rename
#[derive(Debug)]
pub struct RenameOutcome {
    /// The "renamed" revision written under the new root
    pub revision: RevisionId,
    /// What happened to the old root
    pub relocation: Relocation,
}

/// Outcome of recording a deletion
#[derive(Debug)]
pub struct DeleteOutcome {
    /// The "deleted" revision written before retirement
    pub revision: RevisionId,
    /// Retired root, or why the root keeps its active name
    pub retired: Result<PathBuf, MigrationError>,
}

/// Move the history subtree at `old_root` to `new_root`
///
/// Files that already exist under `new_root` are kept as they are. The old
/// root is removed only once every file was copied.
#[must_use]
pub fn relocate(old_root: &Path, new_root: &Path) -> Relocation {
    if !old_root.is_dir() {
        debug!(old = %old_root.display(), "no history to relocate");
        return Relocation::NothingToMove;
    }
    if same_directory(old_root, new_root) {
        debug!(root = %old_root.display(), "rename keeps the same history root");
        return Relocation::SameRoot;
    }

    let (files, skipped) = match copy_tree(old_root, new_root) {
        Ok(counts) => counts,
        Err(message) => {
            let e = MigrationError::Copy {
                from: old_root.to_path_buf(),
                to: new_root.to_path_buf(),
                message,
            };
            error!(error = %e, "history relocation failed");
            return Relocation::Failed(e);
        }
    };

    if let Err(source) = std::fs::remove_dir_all(old_root) {
        let e = MigrationError::RemoveOld {
            path: old_root.to_path_buf(),
            source,
        };
        error!(error = %e, "history copied but old root remains");
        return Relocation::Failed(e);
    }

    info!(old = %old_root.display(), new = %new_root.display(), files, "history relocated");
    Relocation::Moved { files, skipped }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    let (Ok(ma), Ok(mb)) = (std::fs::metadata(a), std::fs::metadata(b)) else {
        return false;
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if ma.dev() == mb.dev() && ma.ino() == mb.ino() {
            return true;
        }
    }
    #[cfg(not(unix))]
    let _ = (ma, mb);
    matches!(
        (a.canonicalize(), b.canonicalize()),
        (Ok(ca), Ok(cb)) if ca == cb
    )
}

fn copy_tree(from: &Path, to: &Path) -> Result<(usize, usize), String> {
    let mut files = 0;
    let mut skipped = 0;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.map_err(|e| e.to_string())?;
        let relative = entry.path().strip_prefix(from).map_err(|e| e.to_string())?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| format!("{}: {e}", target.display()))?;
        } else if target.exists() {
            skipped += 1;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| format!("{}: {e}", entry.path().display()))?;
            files += 1;
        }
    }
    Ok((files, skipped))
}

/// Rename `root` in place to `retired_name`
///
/// # Errors
/// Returns `MigrationError::Retire` if the rename fails; the root then keeps
/// its active name
pub fn retire(root: &Path, retired_name: &str) -> Result<PathBuf, MigrationError> {
    let target = root.with_file_name(retired_name);
    std::fs::rename(root, &target).map_err(|source| MigrationError::Retire {
        from: root.to_path_buf(),
        to: target.clone(),
        source,
    })?;
    info!(root = %root.display(), retired = %target.display(), "history retired");
    Ok(target)
}
