//! History descriptors
//!
//! Metadata recorded once per revision: who did what, and when.

use crate::id::{RevisionId, RevisionIdError};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Display name recorded when no operator is known
pub const ANONYMOUS_NAME: &str = "Anonym";

/// Id recorded when no operator is known
pub const ANONYMOUS_ID: &str = "anonymous";

/// Kind of change a revision records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// First revision of an entity
    Created,
    /// Configuration saved
    Changed,
    /// Entity renamed, history relocated
    Renamed,
    /// Entity deleted, history retired
    Deleted,
}

impl Operation {
    /// Whether this is the origin revision that retention never drops
    #[inline]
    #[must_use]
    pub const fn is_origin(self) -> bool {
        matches!(self, Self::Created)
    }

    /// Human-readable label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Changed => "Changed",
            Self::Renamed => "Renamed",
            Self::Deleted => "Deleted",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of whoever caused a change
///
/// Always passed explicitly; the engine never looks up a "current user".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operator {
    /// Display name
    pub name: String,
    /// Unique id
    pub id: String,
}

impl Operator {
    /// Create an operator identity
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// The anonymous sentinel pair
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_NAME, ANONYMOUS_ID)
    }

    /// Check if this is the anonymous sentinel
    #[inline]
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS_NAME && self.id == ANONYMOUS_ID
    }
}

impl Default for Operator {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Names involved in a rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    /// Name before the rename
    pub old_name: String,
    /// Name after the rename
    pub new_name: String,
}

/// Metadata of one revision
///
/// Written exactly once, when the revision directory is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDescriptor {
    /// Operator display name
    pub user: String,
    /// Operator unique id
    pub user_id: String,
    /// Recorded operation
    pub operation: Operation,
    /// Formatted timestamp, equal to the revision id
    pub timestamp: String,
    /// Present on renamed revisions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameRecord>,
}

impl HistoryDescriptor {
    /// Descriptor for a revision allocated under `id`
    #[must_use]
    pub fn new(operator: &Operator, operation: Operation, id: &RevisionId) -> Self {
        Self {
            user: operator.name.clone(),
            user_id: operator.id.clone(),
            operation,
            timestamp: id.to_string(),
            rename: None,
        }
    }

    /// Attach rename details
    #[inline]
    #[must_use]
    pub fn with_rename(mut self, rename: RenameRecord) -> Self {
        self.rename = Some(rename);
        self
    }

    /// Operator that caused this revision
    #[must_use]
    pub fn operator(&self) -> Operator {
        Operator::new(self.user.clone(), self.user_id.clone())
    }

    /// Revision id encoded in the timestamp field
    ///
    /// # Errors
    /// Returns error if the stored timestamp is not a revision id
    pub fn revision_id(&self) -> Result<RevisionId, RevisionIdError> {
        RevisionId::parse(&self.timestamp)
    }
}
