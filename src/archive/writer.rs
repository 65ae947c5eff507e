//! Archive creation.
//!
//! The [`Archiver`] collaborator turns a staged file list into a compressed
//! container, streaming byte-level progress as it goes. The export pipeline
//! never touches the zip machinery directly.

use crate::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Copy chunk size; one progress update per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// One staged file destined for the archive.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Absolute path of the staged source file.
    pub source: PathBuf,
    /// Entry name inside the archive, e.g. `people/104/bio.md`.
    pub entry_name: String,
}

impl StagedFile {
    /// Creates a staged file mapping.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, entry_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entry_name: entry_name.into(),
        }
    }
}

/// Byte-level progress of an archive creation.
#[derive(Debug, Clone)]
pub struct ArchiverProgress {
    /// Bytes compressed so far.
    pub processed_bytes: u64,
    /// Total bytes across all staged files.
    pub total_bytes: u64,
    /// Entry currently being written.
    pub current_file: String,
}

/// Progress callback for archive creation.
pub type ArchiverProgressCallback = Box<dyn Fn(&ArchiverProgress) + Send>;

/// Collaborator that performs the compression step of an export.
pub trait Archiver: Send + Sync {
    /// Creates an archive at `dest` from the staged files.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be written or a staged
    /// file cannot be read.
    fn create(
        &self,
        files: &[StagedFile],
        dest: &Path,
        progress: Option<&ArchiverProgressCallback>,
    ) -> Result<PathBuf>;
}

/// Zip-backed archiver using deflate compression.
#[derive(Debug, Default)]
pub struct ZipArchiver;

impl ZipArchiver {
    /// Creates a new zip archiver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Archiver for ZipArchiver {
    fn create(
        &self,
        files: &[StagedFile],
        dest: &Path,
        progress: Option<&ArchiverProgressCallback>,
    ) -> Result<PathBuf> {
        let total_bytes: u64 = files
            .iter()
            .map(|f| std::fs::metadata(&f.source).map(|m| m.len()).unwrap_or(0))
            .sum();

        let out = File::create(dest).map_err(|e| Error::op("create_archive_file", e))?;
        let mut zip = ZipWriter::new(out);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut processed_bytes: u64 = 0;
        let mut buf = vec![0u8; CHUNK_SIZE];

        for staged in files {
            zip.start_file(staged.entry_name.as_str(), options)
                .map_err(|e| Error::op("start_archive_entry", format!("{}: {e}", staged.entry_name)))?;

            let mut source = File::open(&staged.source).map_err(|e| {
                Error::op("open_staged_file", format!("{}: {e}", staged.source.display()))
            })?;

            loop {
                let read = source
                    .read(&mut buf)
                    .map_err(|e| Error::op("read_staged_file", e))?;
                if read == 0 {
                    break;
                }
                zip.write_all(&buf[..read])
                    .map_err(|e| Error::op("write_archive_entry", e))?;
                processed_bytes += read as u64;

                if let Some(cb) = progress {
                    cb(&ArchiverProgress {
                        processed_bytes,
                        total_bytes,
                        current_file: staged.entry_name.clone(),
                    });
                }
            }
        }

        zip.finish().map_err(|e| Error::op("finish_archive", e))?;
        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveSource, ZipReader};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[test]
    fn test_create_and_reopen() {
        let dir = TempDir::new().unwrap();
        let bio = dir.path().join("bio.md");
        let manifest = dir.path().join("genealogy-data.json");
        std::fs::write(&bio, "# Ada\n").unwrap();
        std::fs::write(&manifest, r#"{"people":[]}"#).unwrap();

        let dest = dir.path().join("out.zip");
        let files = vec![
            StagedFile::new(&manifest, "genealogy-data.json"),
            StagedFile::new(&bio, "people/104/bio.md"),
        ];

        let path = ZipArchiver::new().create(&files, &dest, None).unwrap();
        assert_eq!(path, dest);

        let reader = ZipReader::open(&dest).unwrap();
        assert!(reader.has_entry("people/104/bio.md"));
        assert_eq!(reader.entries().len(), 2);
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.bin");
        std::fs::write(&big, vec![7u8; 150 * 1024]).unwrap();

        let dest = dir.path().join("out.zip");
        let files = vec![StagedFile::new(&big, "people/104/photos/big.bin")];

        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ArchiverProgressCallback = Box::new(move |p: &ArchiverProgress| {
            sink.lock().unwrap().push(p.processed_bytes);
            assert_eq!(p.total_bytes, 150 * 1024);
            assert_eq!(p.current_file, "people/104/photos/big.bin");
        });

        ZipArchiver::new().create(&files, &dest, Some(&cb)).unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 2, "chunked copy emits multiple updates");
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 150 * 1024);
    }

    #[test]
    fn test_missing_staged_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.zip");
        let files = vec![StagedFile::new(dir.path().join("gone.md"), "gone.md")];

        let err = ZipArchiver::new().create(&files, &dest, None).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }
}
