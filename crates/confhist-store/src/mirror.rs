//! External mirror boundary
//!
//! A [`Mirror`] is told about each revision once it is fully written, e.g. to
//! push it to a remote repository. Mirror failures are logged by the store and
//! never undo the local revision.

use crate::error::MirrorError;
use confhist_revision::{EntityRef, RevisionId};
use std::path::Path;

/// Receiver of recorded revisions
pub trait Mirror: Send + Sync {
    /// Publish the revision `revision` found under `history_root`
    ///
    /// # Errors
    /// Returns error if the mirror could not take the revision
    fn publish(&self, entity: &EntityRef, history_root: &Path, revision: &RevisionId) -> Result<(), MirrorError>;
}

/// Mirror that accepts everything and does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMirror;

impl Mirror for NoMirror {
    #[inline]
    fn publish(&self, _entity: &EntityRef, _history_root: &Path, _revision: &RevisionId) -> Result<(), MirrorError> {
        Ok(())
    }
}
