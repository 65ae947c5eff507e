//! Collaborator traits for the record store.
//!
//! The sync pipelines only see these traits: [`RecordStore`] for person
//! metadata and [`FileStore`] for the raw file operations under the store
//! root. Both are implemented by [`crate::store::FilesystemStore`]; tests
//! substitute their own implementations to inject failures.

use crate::Result;
use crate::models::Person;
use std::path::Path;

/// Canonical person-record storage.
///
/// The backing manifest is read-modify-written per upsert without locking;
/// a single pipeline run at a time is an assumed precondition, not an
/// enforced one.
pub trait RecordStore: Send + Sync {
    /// Reads every person record.
    ///
    /// A store that has never been written reads as empty, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest exists but cannot be read or parsed.
    fn read_all(&self) -> Result<Vec<Person>>;

    /// Inserts or replaces one person record.
    ///
    /// Callers that need merge semantics merge before calling; `upsert`
    /// itself replaces the stored record wholesale.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be rewritten.
    fn upsert(&self, person: &Person) -> Result<()>;

    /// Replaces the whole population.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be written.
    fn save_all(&self, people: &[Person]) -> Result<()>;
}

/// Raw filesystem operations used by the pipelines.
///
/// Kept behind a trait so per-person failure isolation can be exercised in
/// tests without real disk faults.
pub trait FileStore: Send + Sync {
    /// Creates a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails.
    fn ensure_dir(&self, path: &Path) -> Result<()>;

    /// Writes a UTF-8 text file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_text(&self, path: &Path, text: &str) -> Result<()>;

    /// Writes a binary file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_blob(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Copies a file, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64>;

    /// Deletes a file or directory tree. Deleting something that does not
    /// exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing path cannot be removed.
    fn delete(&self, path: &Path) -> Result<()>;
}
