//! Snapshot writer
//!
//! Populates an allocated revision directory: descriptor first, then payload.
//! Files are created with `create_new`, so nothing in a revision is ever
//! overwritten. A failure leaves the directory partially populated and is
//! reported to the caller as-is.

use crate::error::WriteError;
use confhist_revision::{ConfigSnapshot, HistoryDescriptor, HISTORY_FILE};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Buffer size for payload copies
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Write descriptor and optional payload into `revision_dir`
///
/// Returns the payload path when one was written.
///
/// # Errors
/// Any failure to encode or write either file aborts the revision
pub fn write_revision(
    revision_dir: &Path,
    descriptor: &HistoryDescriptor,
    payload: Option<&ConfigSnapshot>,
) -> Result<Option<PathBuf>, WriteError> {
    write_descriptor(revision_dir, descriptor)?;
    payload.map(|snapshot| copy_snapshot(revision_dir, snapshot)).transpose()
}

/// Write the descriptor file
///
/// # Errors
/// Returns error if the file exists already or cannot be written
pub fn write_descriptor(revision_dir: &Path, descriptor: &HistoryDescriptor) -> Result<PathBuf, WriteError> {
    let path = revision_dir.join(HISTORY_FILE);
    let io_err = |source: io::Error| WriteError::Descriptor {
        path: path.clone(),
        source,
    };

    let file = create_new(&path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    encode_descriptor(&mut out, &path, descriptor)?;
    finish(out).map_err(io_err)?;
    Ok(path)
}

/// Encoding errors stay `Serialize`; sink errors carry the descriptor path.
fn encode_descriptor(out: &mut impl Write, path: &Path, descriptor: &HistoryDescriptor) -> Result<(), WriteError> {
    let mut encoded = serde_json::to_vec_pretty(descriptor)?;
    encoded.push(b'\n');
    out.write_all(&encoded).map_err(|source| WriteError::Descriptor {
        path: path.to_path_buf(),
        source,
    })
}

/// Stream a snapshot into the revision directory under its own file name
///
/// Source and destination handles are released on every path out of this
/// function, including errors.
///
/// # Errors
/// - `WriteError::Source` if the source cannot be opened or read
/// - `WriteError::Payload` if the destination cannot be written
pub fn copy_snapshot(revision_dir: &Path, snapshot: &ConfigSnapshot) -> Result<PathBuf, WriteError> {
    let path = revision_dir.join(snapshot.file_name());
    let source_err = |source: io::Error| WriteError::Source {
        name: snapshot.file_name().to_string(),
        source,
    };

    let src = snapshot.open().map_err(source_err)?;
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src);
    let dest = create_new(&path).map_err(|source| WriteError::Payload {
        path: path.clone(),
        source,
    })?;
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest);

    copy_stream(&mut reader, &mut writer).map_err(|e| match e {
        CopyError::Read(source) => source_err(source),
        CopyError::Write(source) => WriteError::Payload {
            path: path.clone(),
            source,
        },
    })?;
    finish(writer).map_err(|source| WriteError::Payload {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

fn copy_stream(reader: &mut impl io::Read, writer: &mut impl Write) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
        total += n as u64;
    }
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn finish(writer: BufWriter<File>) -> io::Result<()> {
    let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use confhist_revision::{Operation, Operator, RevisionId};

    fn descriptor() -> HistoryDescriptor {
        let id = RevisionId::parse("2026-10-16_09-05-01_042").unwrap();
        HistoryDescriptor::new(&Operator::new("Alice", "alice"), Operation::Changed, &id)
    }

    #[test]
    fn writes_descriptor_and_payload() {
        let dir = tempfile::tempdir().unwrap();
        let snap = ConfigSnapshot::from_bytes("config.xml", b"<project/>".to_vec()).unwrap();

        let payload = write_revision(dir.path(), &descriptor(), Some(&snap)).unwrap().unwrap();
        assert_eq!(std::fs::read(&payload).unwrap(), b"<project/>");

        let text = std::fs::read_to_string(dir.path().join(HISTORY_FILE)).unwrap();
        let back: HistoryDescriptor = serde_json::from_str(&text).unwrap();
        assert_eq!(back, descriptor());
    }

    #[test]
    fn descriptor_only_revision() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_revision(dir.path(), &descriptor(), None).unwrap().is_none());
        assert!(dir.path().join(HISTORY_FILE).is_file());
    }

    #[test]
    fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(dir.path(), &descriptor()).unwrap();
        let err = write_descriptor(dir.path(), &descriptor()).unwrap_err();
        assert!(matches!(err, WriteError::Descriptor { .. }));
    }

    struct Full;

    impl Write for Full {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("no space left"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn descriptor_io_failure_names_the_file() {
        let path = Path::new("rev").join(HISTORY_FILE);
        let err = encode_descriptor(&mut Full, &path, &descriptor()).unwrap_err();
        match err {
            WriteError::Descriptor { path: reported, source } => {
                assert_eq!(reported, path);
                assert_eq!(source.to_string(), "no space left");
            }
            other => panic!("expected a descriptor error, got {other:?}"),
        }
    }

    #[test]
    fn streams_large_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("config.xml");
        let body: Vec<u8> = (0..(COPY_BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &body).unwrap();

        let snap = ConfigSnapshot::from_file(&src).unwrap();
        let out = copy_snapshot(dir.path(), &snap).unwrap();
        assert_eq!(std::fs::read(out).unwrap(), body);
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let snap = ConfigSnapshot::from_file(dir.path().join("gone.xml")).unwrap();
        let err = copy_snapshot(dir.path(), &snap).unwrap_err();
        assert!(matches!(err, WriteError::Source { .. }));
        assert!(!dir.path().join("gone.xml").exists());
    }
}
