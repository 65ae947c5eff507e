//! Archive synchronization engine.
//!
//! The diff, conflict resolution, and the import/export pipelines. This is
//! the part of the system where ordering, partial failure, and consistency
//! guarantees live; everything else collaborates through the traits in
//! [`crate::store`] and [`crate::archive`].

pub mod diff;
pub mod export;
pub mod import;
pub mod progress;
pub mod resolver;

pub use diff::{BucketSummary, DiffEngine, DiffOutcome, DiffSummary};
pub use export::{DestinationPicker, ExportPipeline, FixedDestination};
pub use import::{ImportOutcome, ImportPipeline, ImportStage, PendingImport};
pub use progress::{ProgressCallback, ProgressReporter};
pub use resolver::{ConflictResolver, DEFAULT_DECISION_TIMEOUT};
