//! Error types for the history store
//!
//! Errors are split by how the engine treats them:
//! - Allocation and write errors abort the revision being recorded
//! - Read errors make an entry unusable, never a process-level fault
//! - Migration errors are reported inside an outcome, the operation continues
//! - Configuration errors fail loading

use confhist_revision::{PathError, SnapshotError};
use std::path::PathBuf;

/// Errors while claiming a revision directory
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// History root could not be created
    #[error("cannot create history root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed and the directory does not exist
    #[error("could not create revision directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every sampled id clashed with an existing revision
    #[error("no free revision id under {root} after {attempts} attempts")]
    Exhausted { root: PathBuf, attempts: u32 },
}

/// Errors while populating a revision directory
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Descriptor file could not be written
    #[error("io error writing descriptor {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor could not be encoded
    #[error("descriptor encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Payload copy failed on the destination side
    #[error("io error writing snapshot {path}: {source}")]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload source could not be opened or read
    #[error("io error reading snapshot source {name}: {source}")]
    Source {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while reading stored history
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// IO error reading a revision file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descriptor exists but is not a valid record
    #[error("unreadable descriptor {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Revision or payload absent
    #[error("revision not found: {0}")]
    NotFound(PathBuf),
}

impl ReadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while relocating or retiring a history root
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Recursive copy to the new root failed
    #[error("copying history {from} to {to} failed: {message}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    /// Copy succeeded but the old root could not be removed
    #[error("removing old history {path} failed: {source}")]
    RemoveOld {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root could not be renamed to its retired name
    #[error("retiring history {from} as {to} failed: {source}")]
    Retire {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors loading store configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax or type error
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Exclude pattern is not a valid regex
    #[error("invalid exclude pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors reported by an external mirror
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// Mirror could not accept the revision
    #[error("mirror rejected {revision}: {message}")]
    Rejected { revision: String, message: String },

    /// IO error talking to the mirror
    #[error("mirror io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Combined store error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),

    #[error("write error: {0}")]
    Write(#[from] WriteError),

    #[error("read error: {0}")]
    Read(#[from] ReadError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid entity: {0}")]
    InvalidEntity(#[from] PathError),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] SnapshotError),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_error_display() {
        let err = AllocationError::Exhausted {
            root: PathBuf::from("/h/jobs/a"),
            attempts: 3,
        };
        assert_eq!(err.to_string(), "no free revision id under /h/jobs/a after 3 attempts");
    }

    #[test]
    fn read_error_display() {
        let err = ReadError::NotFound(PathBuf::from("/h/jobs/a/x"));
        assert_eq!(err.to_string(), "revision not found: /h/jobs/a/x");
    }

    #[test]
    fn error_conversions() {
        let err: StoreError = AllocationError::Exhausted {
            root: PathBuf::new(),
            attempts: 1,
        }
        .into();
        assert!(matches!(err, StoreError::Allocation(_)));

        let err: StoreError = PathError::Root.into();
        assert!(matches!(err, StoreError::InvalidEntity(_)));
    }
}
