//! Change-event listener
//!
//! Thin wiring between a host's configuration events and [`HistoryStore`].
//! The listener decides which files are worth recording and which operator
//! a revision is attributed to; the store does the rest.

use crate::error::{ConfigError, StoreResult};
use crate::migration::{DeleteOutcome, RenameOutcome};
use crate::store::{HistoryStore, SaveOutcome};
use confhist_revision::{ConfigSnapshot, EntityRef, Operator, RevisionId};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Configuration change reported by the host
#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Entity came into existence
    Created { entity: EntityRef, snapshot: ConfigSnapshot },
    /// Entity configuration was saved
    Saved { entity: EntityRef, snapshot: ConfigSnapshot },
    /// Entity changed its name within its folder
    Renamed {
        entity: EntityRef,
        old_name: String,
        new_name: String,
        snapshot: Option<ConfigSnapshot>,
    },
    /// Entity was removed
    Deleted { entity: EntityRef },
}

impl ConfigEvent {
    /// Entity the event is about
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        match self {
            Self::Created { entity, .. }
            | Self::Saved { entity, .. }
            | Self::Renamed { entity, .. }
            | Self::Deleted { entity } => entity,
        }
    }
}

/// Why an event left no revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// File matched the exclude pattern
    Excluded,
    /// Content equals the latest revision
    Duplicate,
}

/// What handling an event produced
#[derive(Debug)]
pub enum EventOutcome {
    /// A created or changed revision was written
    Recorded(RevisionId),
    /// Nothing was written
    Skipped(SkipReason),
    /// Rename was recorded
    Renamed(RenameOutcome),
    /// Deletion was recorded
    Deleted(DeleteOutcome),
}

impl EventOutcome {
    /// Revision written for this event, if any
    #[must_use]
    pub fn revision(&self) -> Option<&RevisionId> {
        match self {
            Self::Recorded(id) => Some(id),
            Self::Renamed(outcome) => Some(&outcome.revision),
            Self::Deleted(outcome) => Some(&outcome.revision),
            Self::Skipped(_) => None,
        }
    }
}

/// Decides which configuration files are recorded
#[derive(Debug, Clone, Default)]
pub struct SaveFilter {
    exclude: Option<Regex>,
}

impl SaveFilter {
    /// Filter rejecting file names matched by `pattern`
    ///
    /// # Errors
    /// Returns error if the pattern is not a valid regex
    pub fn new(pattern: Option<&str>) -> Result<Self, ConfigError> {
        let exclude = pattern.filter(|p| !p.is_empty()).map(Regex::new).transpose()?;
        Ok(Self { exclude })
    }

    /// Check whether `snapshot` should be recorded
    #[must_use]
    pub fn is_saveable(&self, snapshot: &ConfigSnapshot) -> bool {
        self.exclude
            .as_ref()
            .map_or(true, |re| !re.is_match(snapshot.file_name()))
    }
}

/// Routes host events into a [`HistoryStore`]
///
/// Until [`mark_ready`](Self::mark_ready) is called every revision is
/// attributed to the anonymous operator, matching a host that is still
/// loading and has no session user yet.
#[derive(Debug)]
pub struct HistoryListener {
    store: Arc<HistoryStore>,
    filter: SaveFilter,
    ready: AtomicBool,
}

impl HistoryListener {
    /// Listener using the exclude pattern from the store's configuration
    ///
    /// # Errors
    /// Returns error if the configured exclude pattern is invalid
    pub fn new(store: Arc<HistoryStore>) -> Result<Self, ConfigError> {
        let filter = SaveFilter::new(store.config().effective_exclude_pattern())?;
        Ok(Self::with_filter(store, filter))
    }

    /// Listener with an explicit filter
    #[must_use]
    pub fn with_filter(store: Arc<HistoryStore>, filter: SaveFilter) -> Self {
        Self {
            store,
            filter,
            ready: AtomicBool::new(false),
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    /// Start attributing revisions to the supplied operator
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Check if the host finished initializing
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Record one event
    ///
    /// `operator` is the acting user; `None` means nobody is known.
    ///
    /// # Errors
    /// Returns error if the store fails to record a revision
    pub fn on_event(&self, event: ConfigEvent, operator: Option<&Operator>) -> StoreResult<EventOutcome> {
        let operator = self.resolve_operator(operator);
        trace!(entity = %event.entity(), user = %operator.id, "config event");

        match event {
            ConfigEvent::Created { entity, snapshot } => {
                if !self.filter.is_saveable(&snapshot) {
                    return Ok(self.excluded(&entity, &snapshot));
                }
                self.store
                    .on_entity_created(&entity, &snapshot, &operator)
                    .map(EventOutcome::Recorded)
            }
            ConfigEvent::Saved { entity, snapshot } => {
                if !self.filter.is_saveable(&snapshot) {
                    return Ok(self.excluded(&entity, &snapshot));
                }
                Ok(match self.store.on_entity_saved(&entity, &snapshot, &operator)? {
                    SaveOutcome::Recorded(id) => EventOutcome::Recorded(id),
                    SaveOutcome::SkippedDuplicate => EventOutcome::Skipped(SkipReason::Duplicate),
                })
            }
            ConfigEvent::Renamed {
                entity,
                old_name,
                new_name,
                snapshot,
            } => self
                .store
                .on_entity_renamed(&entity, &old_name, &new_name, snapshot.as_ref(), &operator)
                .map(EventOutcome::Renamed),
            ConfigEvent::Deleted { entity } => self
                .store
                .on_entity_deleted(&entity, &operator)
                .map(EventOutcome::Deleted),
        }
    }

    fn resolve_operator(&self, operator: Option<&Operator>) -> Operator {
        match operator {
            Some(op) if self.is_ready() => op.clone(),
            _ => Operator::anonymous(),
        }
    }

    fn excluded(&self, entity: &EntityRef, snapshot: &ConfigSnapshot) -> EventOutcome {
        debug!(entity = %entity, file = snapshot.file_name(), "file excluded from history");
        EventOutcome::Skipped(SkipReason::Excluded)
    }
}
