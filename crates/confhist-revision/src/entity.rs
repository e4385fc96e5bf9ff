//! Configuration-bearing entities
//!
//! An entity is anything whose configuration history is tracked: an item
//! (job, folder, module), a node, or a global system configuration.

use crate::path::{EntityPath, PathError};
use crate::{JOBS_DIR, NODES_DIR};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Kind of entity, which selects its history namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// Item: job, folder or module, may be nested in folders
    Job,
    /// Build node / agent
    Node,
    /// Global configuration file living directly under the host root
    System,
}

impl EntityKind {
    /// Namespace directory below the history base, if any
    #[inline]
    #[must_use]
    pub const fn namespace(self) -> Option<&'static str> {
        match self {
            Self::Job => Some(JOBS_DIR),
            Self::Node => Some(NODES_DIR),
            Self::System => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Job => "job",
            Self::Node => "node",
            Self::System => "system",
        })
    }
}

impl FromStr for EntityKind {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job" | "item" => Ok(Self::Job),
            "node" | "agent" => Ok(Self::Node),
            "system" => Ok(Self::System),
            other => Err(PathError::Unsupported {
                path: other.to_string(),
                reason: "unknown entity kind",
            }),
        }
    }
}

/// Reference to one entity by kind and logical path
///
/// The engine never owns entities; it only receives this reference plus the
/// payload it has to record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    kind: EntityKind,
    path: EntityPath,
}

impl EntityRef {
    /// Create a reference, validating the path shape for the kind
    ///
    /// # Errors
    /// - `PathError::Root` if the path is empty
    /// - `PathError::Unsupported` for nested or reserved system names
    pub fn new(kind: EntityKind, path: EntityPath) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Root);
        }
        if kind == EntityKind::System {
            if path.len() != 1 {
                return Err(PathError::Unsupported {
                    path: path.to_string(),
                    reason: "system configurations cannot be nested",
                });
            }
            if matches!(path.name(), Some(JOBS_DIR | NODES_DIR)) {
                return Err(PathError::Unsupported {
                    path: path.to_string(),
                    reason: "name is a reserved namespace",
                });
            }
        }
        Ok(Self { kind, path })
    }

    /// Job reference from a `/`-separated path
    ///
    /// # Errors
    /// Returns error if the path is invalid
    pub fn job(path: &str) -> Result<Self, PathError> {
        Self::new(EntityKind::Job, path.parse()?)
    }

    /// Node reference from a `/`-separated path
    ///
    /// # Errors
    /// Returns error if the path is invalid
    pub fn node(path: &str) -> Result<Self, PathError> {
        Self::new(EntityKind::Node, path.parse()?)
    }

    /// System configuration reference (e.g. `hudson.tasks.Maven`)
    ///
    /// # Errors
    /// Returns error if the name is invalid or reserved
    pub fn system(name: &str) -> Result<Self, PathError> {
        Self::new(EntityKind::System, EntityPath::single(name)?)
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Full logical path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &EntityPath {
        &self.path
    }

    /// Entity's own name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        // Construction rejects the root path.
        self.path.name().unwrap_or_default()
    }

    /// Enclosing folder path (root for top-level entities)
    #[inline]
    #[must_use]
    pub fn folder(&self) -> EntityPath {
        self.path.parent().unwrap_or_default()
    }

    /// Same entity under another name in the same folder
    ///
    /// # Errors
    /// Returns error if the name is invalid for this kind
    pub fn with_name(&self, name: &str) -> Result<Self, PathError> {
        Self::new(self.kind, self.path.with_name(name)?)
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.path)
    }
}

/// Parses the display form `kind:path`; a bare path is a job
impl FromStr for EntityRef {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, path)) => Self::new(kind.parse()?, path.parse()?),
            None => Self::job(s),
        }
    }
}
