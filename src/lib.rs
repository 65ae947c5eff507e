//! # Kinship
//!
//! A desktop genealogy record keeper with portable archive synchronization.
//!
//! Kinship keeps canonical per-person records in an on-disk store and
//! synchronizes them with portable snapshot archives: it diffs an archive
//! against the store, resolves conflicts through an explicit decision step,
//! and performs a streamed, fault-tolerant merge (import) or the inverse
//! serialization (export) with fine-grained progress reporting.
//!
//! ## Features
//!
//! - Relational diff over nested person records (New / Update / Unchanged)
//! - Two-phase suspend/resume conflict resolution, testable without a UI
//! - Per-person failure isolation: one bad record never aborts a batch
//! - Streamed zip archive reading and writing with byte-level progress
//! - Symmetric-edge maintenance for the family relation graph
//!
//! ## Example
//!
//! ```rust,ignore
//! use kinship::{ImportPipeline, ImportOutcome, Decision};
//!
//! let pipeline = ImportPipeline::new(store, files, config);
//! let report = match pipeline.start(archive_path)? {
//!     ImportOutcome::Completed(report) => report,
//!     ImportOutcome::NeedsDecision(pending) => {
//!         pipeline.resume(pending, Decision::All)?
//!     },
//! };
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod archive;
pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use config::KinshipConfig;
pub use models::{
    Decision, DecisionRequest, DecisionResponse, ImportReport, Person, PersonId, PersonOutcome,
    PersonStatus, PhotoMeta, ProgressEvent, ProgressMessage, RelationGraph,
};
pub use store::{FileStore, FilesystemStore, RecordStore};
pub use sync::{
    ConflictResolver, DiffEngine, DiffOutcome, ExportPipeline, ImportOutcome, ImportPipeline,
    ProgressReporter,
};

/// Error type for kinship operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed person ids, path traversal attempts, bad CLI arguments |
/// | `OperationFailed` | Filesystem I/O errors, serialization failures, staging errors |
/// | `ArchiveUnreadable` | Archive cannot be opened, or its manifest is missing with no fallback |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A person id contains characters unsafe for a directory name
    /// - A decision response names an unknown action
    /// - CLI arguments cannot be interpreted
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur (read, write, copy, delete)
    /// - The store manifest cannot be serialized or deserialized
    /// - A staging directory cannot be created
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An archive could not be read at the run level.
    ///
    /// Raised when:
    /// - The container cannot be opened as a zip file
    /// - The manifest is missing and no fallback candidates are derivable
    ///   from the file listing
    ///
    /// This is the fatal tier of the error model; per-file and per-person
    /// problems are recorded in the [`models::ImportReport`] instead.
    #[error("archive '{path}' unreadable: {cause}")]
    ArchiveUnreadable {
        /// Path to the offending archive.
        path: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Shorthand for an [`Error::OperationFailed`] from any displayable cause.
    pub(crate) fn op(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for kinship operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("bad id".to_string());
        assert_eq!(err.to_string(), "invalid input: bad id");

        let err = Error::op("write_manifest", "disk full");
        assert_eq!(
            err.to_string(),
            "operation 'write_manifest' failed: disk full"
        );

        let err = Error::ArchiveUnreadable {
            path: "family.zip".to_string(),
            cause: "not a zip file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "archive 'family.zip' unreadable: not a zip file"
        );
    }
}
