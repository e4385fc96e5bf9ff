//! History store facade
//!
//! Entry point for both directions: the host's change events come in through
//! the `on_entity_*` methods, reads go out through listings and revision
//! lookups. Every write runs purge, allocation, descriptor and payload, then
//! the mirror, all synchronously on the caller's thread.

use crate::allocator::RevisionAllocator;
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::duplicate::is_duplicate;
use crate::error::{ReadError, StoreResult};
use crate::index::{self, RevisionListing};
use crate::layout::{child_dirs, classify, is_namespace, DirClass, HistoryLayout, RetiredEntity};
use crate::migration::{relocate, retire, DeleteOutcome, RenameOutcome};
use crate::mirror::{Mirror, NoMirror};
use crate::purge::{purge, PurgeReport};
use crate::writer::write_revision;
use confhist_revision::{
    ConfigSnapshot, EntityKind, EntityPath, EntityRef, HistoryDescriptor, Operation, Operator, RenameRecord,
    RevisionId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a save event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A "changed" revision was written
    Recorded(RevisionId),
    /// Content equals the latest revision; nothing written, nothing purged
    SkippedDuplicate,
}

impl SaveOutcome {
    /// Recorded revision, if any
    #[must_use]
    pub fn revision(&self) -> Option<&RevisionId> {
        match self {
            Self::Recorded(id) => Some(id),
            Self::SkippedDuplicate => None,
        }
    }
}

/// Filesystem-backed configuration history
pub struct HistoryStore {
    config: StoreConfig,
    layout: HistoryLayout,
    allocator: RevisionAllocator,
    clock: Arc<dyn Clock>,
    mirror: Arc<dyn Mirror>,
}

impl HistoryStore {
    /// Store over `config`, using the wall clock and no mirror
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            layout: HistoryLayout::new(config.history_root.clone()),
            allocator: RevisionAllocator::new(Arc::clone(&clock), config.retry),
            clock,
            mirror: Arc::new(NoMirror),
            config,
        }
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.allocator = RevisionAllocator::new(Arc::clone(&clock), self.config.retry);
        self.clock = clock;
        self
    }

    /// Notify `mirror` after each recorded revision
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn Mirror>) -> Self {
        self.mirror = mirror;
        self
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Directory layout
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &HistoryLayout {
        &self.layout
    }

    /// History root of `entity`
    #[inline]
    #[must_use]
    pub fn history_root(&self, entity: &EntityRef) -> PathBuf {
        self.layout.history_root(entity)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Record the origin revision of a new entity
    ///
    /// # Errors
    /// Returns error if the revision cannot be allocated or written
    pub fn on_entity_created(
        &self,
        entity: &EntityRef,
        snapshot: &ConfigSnapshot,
        operator: &Operator,
    ) -> StoreResult<RevisionId> {
        let root = self.history_root(entity);
        self.record_revision(entity, &root, Operation::Created, Some(snapshot), operator, None)
    }

    /// Record a save, unless it repeats the latest revision and duplicate
    /// suppression is on
    ///
    /// # Errors
    /// Returns error if the revision cannot be allocated or written
    pub fn on_entity_saved(
        &self,
        entity: &EntityRef,
        snapshot: &ConfigSnapshot,
        operator: &Operator,
    ) -> StoreResult<SaveOutcome> {
        let root = self.history_root(entity);
        if self.config.skip_duplicate_history && is_duplicate(&root, snapshot) {
            debug!(entity = %entity, "content unchanged, skipping revision");
            return Ok(SaveOutcome::SkippedDuplicate);
        }
        self.record_revision(entity, &root, Operation::Changed, Some(snapshot), operator, None)
            .map(SaveOutcome::Recorded)
    }

    /// Move history from `old_name` to `new_name` and record the rename
    ///
    /// `entity` locates the folder; its own name is ignored. Without a
    /// `snapshot` the renamed revision repeats the latest stored payload.
    /// Relocation problems are reported in the outcome, the "renamed"
    /// revision is written regardless.
    ///
    /// # Errors
    /// Returns error if a name is invalid or the revision cannot be written
    pub fn on_entity_renamed(
        &self,
        entity: &EntityRef,
        old_name: &str,
        new_name: &str,
        snapshot: Option<&ConfigSnapshot>,
        operator: &Operator,
    ) -> StoreResult<RenameOutcome> {
        let old = entity.with_name(old_name)?;
        let new = entity.with_name(new_name)?;
        let old_root = self.history_root(&old);
        let new_root = self.history_root(&new);

        let relocation = relocate(&old_root, &new_root);

        let fallback;
        let payload = match snapshot {
            Some(snapshot) => Some(snapshot),
            None => {
                fallback = self.latest_payload(&new_root);
                fallback.as_ref()
            }
        };
        let rename = RenameRecord {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        };
        let revision = self.record_revision(&new, &new_root, Operation::Renamed, payload, operator, Some(rename))?;
        Ok(RenameOutcome { revision, relocation })
    }

    /// Record the final revision of `entity` and retire its history root
    ///
    /// The "deleted" revision repeats the latest stored payload so the retired
    /// history stays readable. A failed retirement is reported in the outcome.
    ///
    /// # Errors
    /// Returns error if the final revision cannot be written
    pub fn on_entity_deleted(&self, entity: &EntityRef, operator: &Operator) -> StoreResult<DeleteOutcome> {
        let root = self.history_root(entity);
        // Loaded before purge runs, which may remove the revision it came from.
        let last = self.latest_payload(&root);
        let revision = self.record_revision(entity, &root, Operation::Deleted, last.as_ref(), operator, None)?;

        let retired_name = HistoryLayout::retired_name(entity.name(), self.clock.now());
        let retired = retire(&root, &retired_name);
        if let Err(e) = &retired {
            warn!(entity = %entity, error = %e, "history root stays under its active name");
        }
        Ok(DeleteOutcome { revision, retired })
    }

    /// Apply a retention cap to one entity right now
    #[must_use]
    pub fn purge(&self, entity: &EntityRef, max_entries: u32) -> PurgeReport {
        purge(&self.history_root(entity), max_entries)
    }

    fn record_revision(
        &self,
        entity: &EntityRef,
        root: &Path,
        operation: Operation,
        payload: Option<&ConfigSnapshot>,
        operator: &Operator,
        rename: Option<RenameRecord>,
    ) -> StoreResult<RevisionId> {
        let report = purge(root, self.config.max_history_entries);
        if !report.is_noop() {
            debug!(
                entity = %entity,
                removed = report.removed.len(),
                failed = report.failures.len(),
                "purged old revisions"
            );
        }

        let allocated = self.allocator.allocate(root)?;
        let mut descriptor = HistoryDescriptor::new(operator, operation, &allocated.id);
        if let Some(rename) = rename {
            descriptor = descriptor.with_rename(rename);
        }
        write_revision(&allocated.dir, &descriptor, payload)?;

        info!(
            entity = %entity,
            revision = %allocated.id,
            operation = %operation,
            user = %operator.id,
            "recorded revision"
        );
        if let Err(e) = self.mirror.publish(entity, root, &allocated.id) {
            warn!(entity = %entity, revision = %allocated.id, error = %e, "mirror did not accept revision");
        }
        Ok(allocated.id)
    }

    /// Latest payload under `root`, read into memory
    fn latest_payload(&self, root: &Path) -> Option<ConfigSnapshot> {
        let (id, path) = RevisionListing::scan(root).latest_snapshot()?;
        let name = path.file_name()?.to_str()?.to_string();
        match std::fs::read(&path) {
            Ok(bytes) => ConfigSnapshot::from_bytes(name, bytes).ok(),
            Err(e) => {
                warn!(revision = %id, error = %e, "cannot read latest payload");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Revisions of `entity`, ascending; descriptors are parsed on access
    #[must_use]
    pub fn list_revisions(&self, entity: &EntityRef) -> RevisionListing {
        RevisionListing::scan(self.history_root(entity))
    }

    /// Revision ids of `entity`, ascending, without parsing descriptors
    #[must_use]
    pub fn list_revision_ids(&self, entity: &EntityRef) -> Vec<RevisionId> {
        index::list_revision_ids(&self.history_root(entity))
    }

    /// Descriptor of one revision
    ///
    /// # Errors
    /// Returns error if the descriptor is missing or unreadable
    pub fn load_descriptor(&self, entity: &EntityRef, id: &RevisionId) -> Result<HistoryDescriptor, ReadError> {
        index::load_descriptor(&self.history_root(entity).join(id.as_str()))
    }

    /// Payload path of one revision; `None` if revision or payload is absent
    #[must_use]
    pub fn get_revision(&self, entity: &EntityRef, id: &RevisionId) -> Option<PathBuf> {
        index::resolve_snapshot(&self.history_root(entity), id)
    }

    /// Payload bytes of one revision
    ///
    /// # Errors
    /// Returns error if the payload exists but cannot be read
    pub fn read_revision(&self, entity: &EntityRef, id: &RevisionId) -> Result<Option<Vec<u8>>, ReadError> {
        index::read_snapshot(&self.history_root(entity), id)
    }

    /// Check whether a revision with a payload exists
    #[must_use]
    pub fn revision_exists(&self, entity: &EntityRef, id: &RevisionId) -> bool {
        self.get_revision(entity, id).is_some()
    }

    /// Live entities of `kind` directly in `folder` that have history
    ///
    /// For system configurations `folder` must be the root.
    #[must_use]
    pub fn list_entities_with_history(&self, kind: EntityKind, folder: &EntityPath) -> Vec<EntityRef> {
        if kind == EntityKind::System {
            return if folder.is_empty() {
                self.list_system_configs()
            } else {
                Vec::new()
            };
        }
        let container = self.layout.container(kind, folder);
        child_dirs(&container)
            .into_iter()
            .filter_map(|name| match classify(&name) {
                DirClass::Active(name) => Some(name),
                _ => None,
            })
            .filter(|name| !index::list_revision_ids(&container.join(name)).is_empty())
            .filter_map(|name| folder.child(name).ok())
            .filter_map(|path| EntityRef::new(kind, path).ok())
            .collect()
    }

    /// Retired histories of `kind` directly in `folder`
    #[must_use]
    pub fn list_deleted_entities_with_history(&self, kind: EntityKind, folder: &EntityPath) -> Vec<RetiredEntity> {
        if kind == EntityKind::System && !folder.is_empty() {
            return Vec::new();
        }
        let container = self.layout.container(kind, folder);
        child_dirs(&container)
            .into_iter()
            .filter_map(|dir_name| match classify(&dir_name) {
                DirClass::Retired { name, deleted_at } => Some(RetiredEntity {
                    name,
                    deleted_at,
                    root: container.join(&dir_name),
                }),
                _ => None,
            })
            .collect()
    }

    /// Revisions of a retired history
    #[must_use]
    pub fn retired_revisions(&self, retired: &RetiredEntity) -> RevisionListing {
        RevisionListing::scan(&retired.root)
    }

    /// System configurations that have history
    #[must_use]
    pub fn list_system_configs(&self) -> Vec<EntityRef> {
        let base = self.layout.base();
        child_dirs(base)
            .into_iter()
            .filter(|name| !is_namespace(name))
            .filter_map(|name| match classify(&name) {
                DirClass::Active(name) => Some(name),
                _ => None,
            })
            .filter(|name| !index::list_revision_ids(&base.join(name)).is_empty())
            .filter_map(|name| EntityRef::system(&name).ok())
            .collect()
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("config", &self.config)
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}
