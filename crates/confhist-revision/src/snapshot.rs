//! Configuration snapshots
//!
//! A [`ConfigSnapshot`] is the opaque payload to copy into a revision: a file
//! name plus a byte source (an existing file or in-memory bytes).

use crate::{CONFIG_EXTENSION, HISTORY_FILE, NODE_CONFIG_FILE};
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Where snapshot bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Copy an existing configuration file, streamed
    File(PathBuf),
    /// Bytes already serialized by the caller
    Bytes(Vec<u8>),
}

/// Payload of one revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    file_name: String,
    source: SnapshotSource,
}

impl ConfigSnapshot {
    /// Snapshot of an existing configuration file, keeping its name
    ///
    /// # Errors
    /// Returns error if the path has no usable file name
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SnapshotError::NoFileName(path.clone()))?
            .to_string();
        validate_file_name(&file_name)?;
        Ok(Self {
            file_name,
            source: SnapshotSource::File(path),
        })
    }

    /// Snapshot of in-memory content under the given file name
    ///
    /// # Errors
    /// Returns error if the file name is not a plain `*.xml` name
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self, SnapshotError> {
        let file_name = file_name.into();
        validate_file_name(&file_name)?;
        Ok(Self {
            file_name,
            source: SnapshotSource::Bytes(bytes.into()),
        })
    }

    /// Node configuration serialized by the caller, stored as `config.xml`
    #[must_use]
    pub fn node_config(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: NODE_CONFIG_FILE.to_string(),
            source: SnapshotSource::Bytes(bytes.into()),
        }
    }

    /// File name inside the revision directory
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Byte source
    #[inline]
    #[must_use]
    pub fn source(&self) -> &SnapshotSource {
        &self.source
    }

    /// Open the source for streaming
    ///
    /// # Errors
    /// Returns error if the source file cannot be opened
    pub fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match &self.source {
            SnapshotSource::File(path) => Ok(Box::new(File::open(path)?)),
            SnapshotSource::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
        }
    }

    /// Materialize the whole payload
    ///
    /// # Errors
    /// Returns error if the source cannot be read
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        match &self.source {
            SnapshotSource::File(path) => std::fs::read(path),
            SnapshotSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Whether a file inside a revision directory is a configuration payload
#[must_use]
pub fn is_config_file_name(name: &str) -> bool {
    name != HISTORY_FILE
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext == CONFIG_EXTENSION)
}

fn validate_file_name(name: &str) -> Result<(), SnapshotError> {
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(SnapshotError::InvalidFileName(name.to_string()));
    }
    if !is_config_file_name(name) {
        return Err(SnapshotError::UnrecognizedExtension(name.to_string()));
    }
    Ok(())
}

/// Errors building a snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Path ends in `..` or is not valid UTF-8
    #[error("no usable file name in {0}")]
    NoFileName(PathBuf),

    /// Name contains separators or is hidden
    #[error("invalid snapshot file name: '{0}'")]
    InvalidFileName(String),

    /// Name lacks the configuration extension
    #[error("snapshot file '{0}' must have the .xml extension")]
    UnrecognizedExtension(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bytes_snapshot_reads_back() {
        let snap = ConfigSnapshot::from_bytes("config.xml", b"<project/>".to_vec()).unwrap();
        let mut out = Vec::new();
        snap.open().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"<project/>");
        assert_eq!(snap.read_all().unwrap(), b"<project/>");
    }

    #[test]
    fn file_snapshot_keeps_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hudson.tasks.Maven.xml");
        File::create(&path).unwrap().write_all(b"<maven/>").unwrap();

        let snap = ConfigSnapshot::from_file(&path).unwrap();
        assert_eq!(snap.file_name(), "hudson.tasks.Maven.xml");
        assert_eq!(snap.read_all().unwrap(), b"<maven/>");
    }

    #[test]
    fn rejects_non_config_names() {
        assert!(matches!(
            ConfigSnapshot::from_bytes("config.json", Vec::new()),
            Err(SnapshotError::UnrecognizedExtension(_))
        ));
        assert!(matches!(
            ConfigSnapshot::from_bytes("../config.xml", Vec::new()),
            Err(SnapshotError::InvalidFileName(_))
        ));
    }

    #[test]
    fn descriptor_is_never_a_config_file() {
        assert!(is_config_file_name("config.xml"));
        assert!(!is_config_file_name(HISTORY_FILE));
        assert!(!is_config_file_name("notes.txt"));
    }

    #[test]
    fn node_config_uses_fixed_name() {
        assert_eq!(ConfigSnapshot::node_config("<slave/>").file_name(), "config.xml");
    }
}
