//! Revision directory allocation
//!
//! Claims a fresh, uniquely named directory under a history root. The claim is
//! a non-recursive directory create: an existing directory of the same name is
//! a clash, answered by backing off and sampling a new instant.

use crate::clock::Clock;
use crate::config::RetryPolicy;
use crate::error::AllocationError;
use confhist_revision::RevisionId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A claimed, empty revision directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedRevision {
    /// Revision id (directory name)
    pub id: RevisionId,
    /// Full path of the directory
    pub dir: PathBuf,
}

/// Allocates collision-free revision directories
#[derive(Clone)]
pub struct RevisionAllocator {
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl RevisionAllocator {
    /// Create allocator over a clock
    #[inline]
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self { clock, policy }
    }

    /// Retry policy in effect
    #[inline]
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Claim a new revision directory under `history_root`
    ///
    /// Creates `history_root` if needed. Each attempt samples the clock; a
    /// clash waits one retry interval before the next attempt.
    ///
    /// # Errors
    /// - `AllocationError::CreateRoot` if the root cannot be created
    /// - `AllocationError::CreateDir` if creation fails and nothing exists afterwards
    /// - `AllocationError::Exhausted` after `max_attempts` clashes
    pub fn allocate(&self, history_root: &Path) -> Result<AllocatedRevision, AllocationError> {
        std::fs::create_dir_all(history_root).map_err(|source| AllocationError::CreateRoot {
            path: history_root.to_path_buf(),
            source,
        })?;

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let id = RevisionId::from_instant(self.clock.now());
            let dir = history_root.join(id.as_str());
            match std::fs::create_dir(&dir) {
                Ok(()) => return Ok(AllocatedRevision { id, dir }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(dir = %dir.display(), attempt, "clash on revision directory, waiting");
                    if attempt < max_attempts {
                        self.clock.sleep(self.policy.interval());
                    }
                }
                // Creation can report failure although the directory is there.
                Err(_) if dir.is_dir() => return Ok(AllocatedRevision { id, dir }),
                Err(source) => return Err(AllocationError::CreateDir { path: dir, source }),
            }
        }

        Err(AllocationError::Exhausted {
            root: history_root.to_path_buf(),
            attempts: max_attempts,
        })
    }
}

impl std::fmt::Debug for RevisionAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionAllocator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
