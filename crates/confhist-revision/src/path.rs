//! Logical entity paths
//!
//! Provides [`EntityPath`] for addressing an entity inside the host's folder
//! namespace, e.g. `team/backend/build`.

use crate::{RevisionId, DELETED_MARKER};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path of an entity within its folder hierarchy
///
/// Hierarchical structure using `/`-separated segments. The last segment is
/// the entity's own name, the preceding ones are its enclosing folders.
///
/// # Examples
/// - `["build"]` → `build`
/// - `["team", "backend", "build"]` → `team/backend/build`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityPath(Vec<String>);

impl EntityPath {
    /// Create new path from segments, validating each one
    ///
    /// # Errors
    /// Returns error if any segment is empty, contains a separator, is a
    /// relative component, embeds the deletion marker or reads as a revision id
    pub fn new(segments: Vec<String>) -> Result<Self, PathError> {
        for seg in &segments {
            validate_segment(seg)?;
        }
        Ok(Self(segments))
    }

    /// Create path from a single segment
    ///
    /// # Errors
    /// Returns error if the segment is invalid
    pub fn single(segment: impl Into<String>) -> Result<Self, PathError> {
        Self::new(vec![segment.into()])
    }

    /// Empty path (namespace root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Enclosing folder (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Entity's own name (last segment)
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new path
    ///
    /// # Errors
    /// Returns error if the segment is invalid
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut new = self.clone();
        new.0.push(segment);
        Ok(new)
    }

    /// Same folder, different last segment
    ///
    /// # Errors
    /// Returns error if the path is root or the new name is invalid
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self, PathError> {
        let parent = self.parent().ok_or(PathError::Root)?;
        parent.child(name)
    }

    /// Check if this path is a prefix of another
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        Err(PathError::EmptySegment)
    } else if seg == "." || seg == ".." || seg.contains(['/', '\\']) {
        Err(PathError::InvalidSegment(seg.to_string()))
    } else if seg.contains(DELETED_MARKER) {
        Err(PathError::ReservedMarker(seg.to_string()))
    } else if RevisionId::is_revision_name(seg) {
        Err(PathError::RevisionShaped(seg.to_string()))
    } else {
        Ok(())
    }
}

impl Display for EntityPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for EntityPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::new(trimmed.split('/').map(str::to_string).collect())
    }
}

impl Default for EntityPath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to entity paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Separator or relative component inside a segment
    #[error("invalid segment: '{0}'")]
    InvalidSegment(String),

    /// Segment embeds the retired-history marker
    #[error("segment '{0}' contains the reserved deletion marker")]
    ReservedMarker(String),

    /// Segment would be taken for a revision directory
    #[error("segment '{0}' has the shape of a revision id")]
    RevisionShaped(String),

    /// Operation needs a named entity, got the root
    #[error("path is the namespace root")]
    Root,

    /// Entity kind does not allow this shape
    #[error("unsupported path '{path}': {reason}")]
    Unsupported { path: String, reason: &'static str },
}
