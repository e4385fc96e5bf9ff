//! On-disk layout of histories
//!
//! Maps entities to history roots and classifies directories found below the
//! history base:
//!
//! ```text
//! <base>/jobs/team/jobs/build/<revision>/{history.json, config.xml}
//! <base>/jobs/team/jobs/old_deleted_20261016_090501_042/...
//! <base>/nodes/agent-1/<revision>/...
//! <base>/hudson.tasks.Maven/<revision>/...
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use confhist_revision::{
    EntityKind, EntityPath, EntityRef, RevisionId, DELETED_MARKER, DELETED_SUFFIX_FORMAT, JOBS_DIR,
    NODES_DIR,
};
use std::path::{Path, PathBuf};

/// Deterministic entity → directory mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLayout {
    base: PathBuf,
}

impl HistoryLayout {
    /// Layout below `base`
    #[inline]
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// History base directory
    #[inline]
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// History root of one entity
    ///
    /// The same entity always maps to the same root; a renamed entity maps to
    /// a sibling of its old root.
    #[must_use]
    pub fn history_root(&self, entity: &EntityRef) -> PathBuf {
        self.nested(entity.kind(), entity.path())
    }

    /// Directory whose children are the histories of entities in `folder`
    #[must_use]
    pub fn container(&self, kind: EntityKind, folder: &EntityPath) -> PathBuf {
        match kind.namespace() {
            None => self.base.clone(),
            Some(ns) if folder.is_empty() => self.base.join(ns),
            Some(ns) => self.nested(kind, folder).join(ns),
        }
    }

    fn nested(&self, kind: EntityKind, path: &EntityPath) -> PathBuf {
        let mut dir = self.base.clone();
        match kind.namespace() {
            None => {
                for seg in path.iter() {
                    dir.push(seg);
                }
            }
            Some(ns) => {
                for seg in path.iter() {
                    dir.push(ns);
                    dir.push(seg);
                }
            }
        }
        dir
    }

    /// Name a history root takes once its entity is deleted
    #[must_use]
    pub fn retired_name(name: &str, at: DateTime<Utc>) -> String {
        format!("{name}{DELETED_MARKER}{}", at.format(DELETED_SUFFIX_FORMAT))
    }
}

/// Classification of a directory name below a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirClass {
    /// Revision of the enclosing entity
    Revision(RevisionId),
    /// History of a live entity
    Active(String),
    /// History of a deleted entity
    Retired {
        name: String,
        deleted_at: Option<DateTime<Utc>>,
    },
}

/// Classify a directory name
#[must_use]
pub fn classify(dir_name: &str) -> DirClass {
    if let Ok(id) = RevisionId::parse(dir_name) {
        return DirClass::Revision(id);
    }
    match dir_name.split_once(DELETED_MARKER) {
        Some((name, suffix)) => DirClass::Retired {
            name: name.to_string(),
            deleted_at: NaiveDateTime::parse_from_str(suffix, DELETED_SUFFIX_FORMAT)
                .ok()
                .map(|naive| naive.and_utc()),
        },
        None => DirClass::Active(dir_name.to_string()),
    }
}

/// History of a deleted entity, kept for read access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredEntity {
    /// Entity name before deletion
    pub name: String,
    /// When it was retired, if the suffix parses
    pub deleted_at: Option<DateTime<Utc>>,
    /// Retired history root
    pub root: PathBuf,
}

impl RetiredEntity {
    /// Retired directory name
    #[must_use]
    pub fn dir_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Whether a name at the history base is a namespace rather than a system config
#[must_use]
pub fn is_namespace(dir_name: &str) -> bool {
    dir_name == JOBS_DIR || dir_name == NODES_DIR
}

/// Child directory names of `dir`, sorted; missing or unreadable dirs yield none
pub(crate) fn child_dirs(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}
