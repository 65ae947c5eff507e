//! Archive import pipeline.
//!
//! Orchestrates per-person extraction, merge, and metadata upsert with
//! per-person failure isolation. The run is a two-phase state machine:
//! [`ImportPipeline::start`] either completes outright or suspends into a
//! [`PendingImport`] token when conflicting updates need a decision, and
//! [`ImportPipeline::resume`] applies the decision. No store write happens
//! before the decision, so a `cancel` leaves the store byte-identical.

use crate::archive::{
    self, ArchiveSource, ArchivedPerson, ManifestValidator, ValidationSeverity, ZipReader,
};
use crate::config::KinshipConfig;
use crate::models::{
    Decision, DecisionRequest, ImportReport, Person, PersonId, PersonOutcome, PhotoMeta,
    ProgressEvent, ProgressMessage,
};
use crate::store::{is_safe_id, FileStore, RecordStore};
use crate::sync::diff::{DiffEngine, DiffOutcome};
use crate::sync::progress::ProgressReporter;
use crate::sync::resolver::ConflictResolver;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Pipeline stages, in run order.
///
/// `AwaitingDecision` is entered only when conflicts exist; `Aborted` is
/// reachable only from `AwaitingDecision` via a `cancel` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    /// Nothing running.
    Idle,
    /// Opening the archive and reading the manifest.
    Opening,
    /// Classifying archive records against the store.
    Diffing,
    /// Suspended, waiting for a conflict decision.
    AwaitingDecision,
    /// Streaming files into the staging area.
    Extracting,
    /// Merging metadata and moving staged files into the store.
    Merging,
    /// Removing the staging area.
    Cleanup,
    /// Run finished.
    Done,
    /// Run cancelled before any write.
    Aborted,
}

impl ImportStage {
    /// Stable progress-message key for this stage.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Idle => "import.idle",
            Self::Opening => "import.opening",
            Self::Diffing => "import.diffing",
            Self::AwaitingDecision => "import.awaiting_decision",
            Self::Extracting => "import.extracting",
            Self::Merging => "import.merging",
            Self::Cleanup => "import.cleanup",
            Self::Done => "import.done",
            Self::Aborted => "import.aborted",
        }
    }
}

/// Outcome of [`ImportPipeline::start`].
#[derive(Debug)]
pub enum ImportOutcome {
    /// The run finished without needing a decision.
    Completed(ImportReport),
    /// Conflicting updates exist; resume with a [`Decision`].
    NeedsDecision(PendingImport),
}

/// Resumable token for a suspended import.
///
/// Holds the open archive handle and the computed diff; dropping it without
/// resuming releases the archive with zero mutation.
#[derive(Debug)]
pub struct PendingImport {
    reader: ZipReader,
    people: Vec<ArchivedPerson>,
    store_people: Vec<Person>,
    diff: DiffOutcome,
}

impl PendingImport {
    /// Builds the request for the deciding collaborator.
    #[must_use]
    pub fn request(&self) -> DecisionRequest {
        self.diff.decision_request()
    }

    /// The diff awaiting a decision.
    #[must_use]
    pub fn diff(&self) -> &DiffOutcome {
        &self.diff
    }
}

/// One relevant archive file for a person.
struct RelevantEntry {
    /// Logical entry name in the archive.
    name: String,
    /// Path relative to the person directory, e.g. `photos/a.jpg`.
    rel: String,
    size: u64,
    is_photo: bool,
}

/// Service that imports a snapshot archive into the record store.
pub struct ImportPipeline {
    store: Arc<dyn RecordStore>,
    files: Arc<dyn FileStore>,
    config: KinshipConfig,
    progress: ProgressReporter,
}

impl ImportPipeline {
    /// Creates a new import pipeline.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        files: Arc<dyn FileStore>,
        config: KinshipConfig,
    ) -> Self {
        Self {
            store,
            files,
            config,
            progress: ProgressReporter::noop(),
        }
    }

    /// Sets the progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Creates a conflict resolver wired to fresh decision channels, using
    /// the configured liveness timeout.
    ///
    /// The returned receiver/sender pair is the collaborator's side of the
    /// protocol: requests arrive on the receiver, the answer goes back on
    /// the sender.
    #[must_use]
    pub fn decision_channel(
        &self,
    ) -> (
        ConflictResolver,
        std::sync::mpsc::Receiver<DecisionRequest>,
        std::sync::mpsc::Sender<crate::models::DecisionResponse>,
    ) {
        let (req_tx, req_rx) = std::sync::mpsc::channel();
        let (resp_tx, resp_rx) = std::sync::mpsc::channel();
        let resolver =
            ConflictResolver::new(req_tx, resp_rx).with_timeout(self.config.decision_timeout);
        (resolver, req_rx, resp_tx)
    }

    /// Runs an import end to end, resolving conflicts over the decision
    /// channel owned by `resolver`.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-level failures (unreadable archive);
    /// per-person failures are recorded in the report.
    #[instrument(skip(self, resolver), fields(operation = "import.run"))]
    pub fn run(&self, archive_path: &Path, resolver: &ConflictResolver) -> Result<ImportReport> {
        match self.start(archive_path)? {
            ImportOutcome::Completed(report) => Ok(report),
            ImportOutcome::NeedsDecision(pending) => {
                let decision = resolver.resolve(pending.request());
                self.resume(pending, decision)
            },
        }
    }

    /// Opens and diffs the archive, completing immediately when no update
    /// conflicts exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveUnreadable`] if the container cannot be
    /// opened or its manifest is missing with no fallback candidates.
    #[instrument(skip(self), fields(operation = "import.start"))]
    pub fn start(&self, archive_path: &Path) -> Result<ImportOutcome> {
        self.emit_stage(ImportStage::Opening, "opening archive");
        let mut reader = ZipReader::open(archive_path)?;
        let people = self.load_people(&mut reader, archive_path)?;

        self.emit_stage(ImportStage::Diffing, "computing differences");
        let store_people = self.store.read_all()?;
        let diff = DiffEngine::new().compute(&people, &store_people);
        tracing::info!(
            to_add = diff.to_add.len(),
            to_update = diff.to_update.len(),
            unchanged = diff.unchanged.len(),
            "archive diff computed: {}",
            diff.summary
        );

        if diff.has_conflicts() {
            self.emit_stage(ImportStage::AwaitingDecision, "waiting for a decision");
            return Ok(ImportOutcome::NeedsDecision(PendingImport {
                reader,
                people,
                store_people,
                diff,
            }));
        }

        self.execute(reader, &people, &store_people, &diff, &Decision::All)
            .map(ImportOutcome::Completed)
    }

    /// Applies a decision to a suspended import.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-level failures; `cancel` is not an
    /// error and yields a report with `cancelled == true`.
    #[instrument(skip(self, pending), fields(operation = "import.resume"))]
    pub fn resume(&self, pending: PendingImport, decision: Decision) -> Result<ImportReport> {
        if decision == Decision::Cancel {
            self.emit_stage(ImportStage::Aborted, "import cancelled");
            metrics::counter!("archive_import_total", "status" => "cancelled").increment(1);
            return Ok(ImportReport::cancelled());
        }

        let PendingImport {
            reader,
            people,
            store_people,
            diff,
        } = pending;
        self.execute(reader, &people, &store_people, &diff, &decision)
    }

    /// Reads the manifest, falling back to the file listing when it is
    /// missing or unusable. Fatal only when neither yields any person.
    fn load_people(
        &self,
        reader: &mut ZipReader,
        archive_path: &Path,
    ) -> Result<Vec<ArchivedPerson>> {
        match reader.manifest_json()? {
            Some(json) => match ManifestValidator::new().decode(&json) {
                Ok(decoded) => {
                    for issue in &decoded.issues {
                        match issue.severity {
                            ValidationSeverity::Error => tracing::warn!(
                                field = %issue.field,
                                "skipped manifest entry: {}",
                                issue.message
                            ),
                            ValidationSeverity::Warning => tracing::warn!(
                                field = %issue.field,
                                "manifest entry issue: {}",
                                issue.message
                            ),
                        }
                    }
                    Ok(decoded.people)
                },
                Err(e) => {
                    tracing::warn!("manifest unusable ({e}); deriving worklist from listing");
                    self.people_from_listing(reader, archive_path)
                },
            },
            None => {
                tracing::warn!("manifest missing; deriving worklist from listing");
                self.people_from_listing(reader, archive_path)
            },
        }
    }

    fn people_from_listing(
        &self,
        reader: &ZipReader,
        archive_path: &Path,
    ) -> Result<Vec<ArchivedPerson>> {
        let people: Vec<ArchivedPerson> = reader
            .person_ids_from_listing()
            .into_iter()
            .filter(|id| {
                let safe = is_safe_id(id.as_str());
                if !safe {
                    tracing::warn!(%id, "ignoring person directory with unsafe id");
                }
                safe
            })
            .map(ArchivedPerson::bare)
            .collect();

        if people.is_empty() {
            return Err(Error::ArchiveUnreadable {
                path: archive_path.display().to_string(),
                cause: "manifest missing and no fallback candidates in file listing".to_string(),
            });
        }
        Ok(people)
    }

    /// Executes the post-decision half of the run: staging, merging, and
    /// the final report. All store writes happen here.
    fn execute(
        &self,
        mut reader: ZipReader,
        people: &[ArchivedPerson],
        store_people: &[Person],
        diff: &DiffOutcome,
        decision: &Decision,
    ) -> Result<ImportReport> {
        let start = Instant::now();

        let Some(applied) = applied_ids(diff, decision) else {
            // Defensive: resume() short-circuits cancel before execute.
            self.emit_stage(ImportStage::Aborted, "import cancelled");
            return Ok(ImportReport::cancelled());
        };
        let worklist: Vec<&ArchivedPerson> =
            people.iter().filter(|p| applied.contains(&p.id)).collect();

        let mut report = ImportReport {
            total_persons: worklist.len(),
            ..ImportReport::default()
        };

        // Progress normalization across the whole worklist.
        let relevant: Vec<Vec<RelevantEntry>> = worklist
            .iter()
            .map(|p| relevant_entries(&reader, &p.id))
            .collect();
        let total_files: usize = relevant.iter().map(Vec::len).sum();
        let total_bytes: u64 = relevant
            .iter()
            .flat_map(|entries| entries.iter().map(|e| e.size))
            .sum();

        let existing: HashMap<&PersonId, &Person> =
            store_people.iter().map(|p| (&p.id, p)).collect();

        let staging_root = self
            .config
            .staging_dir
            .join(format!("import-{}", uuid::Uuid::new_v4()));
        if !worklist.is_empty() {
            self.files.ensure_dir(&staging_root)?;
        }

        self.emit_stage(ImportStage::Extracting, "extracting archive content");
        let mut cursor = Cursor {
            person_index: 0,
            person_total: worklist.len(),
            processed_files: 0,
            total_files,
            processed_bytes: 0,
            total_bytes,
        };

        for (index, (person, entries)) in worklist.iter().copied().zip(&relevant).enumerate() {
            cursor.person_index = index + 1;
            let mut outcome = PersonOutcome::ok(person.id.clone());

            let result = self.process_person(
                &mut reader,
                person,
                entries,
                existing.get(&person.id).copied(),
                &staging_root,
                &mut cursor,
                &mut outcome,
            );
            if let Err(e) = result {
                tracing::warn!(person = %person.id, "person import failed: {e}");
                outcome.fail(e.to_string());
            }

            report.record(outcome);
        }

        self.emit_stage(ImportStage::Cleanup, "removing staging area");
        if let Err(e) = self.files.delete(&staging_root) {
            tracing::warn!("failed to remove staging area: {e}");
        }
        drop(reader);

        self.emit_stage(ImportStage::Done, report.summary());
        tracing::info!(
            total = report.total_persons,
            success = report.success,
            failed = report.failed,
            "import finished"
        );

        metrics::counter!("archive_import_total", "status" => "success").increment(1);
        metrics::histogram!("archive_import_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Ok(report)
    }

    /// Processes one person: photo metadata, staged extraction, merge
    /// upsert, and the move into the live store directory.
    #[allow(clippy::too_many_arguments)]
    fn process_person(
        &self,
        reader: &mut ZipReader,
        person: &ArchivedPerson,
        entries: &[RelevantEntry],
        existing: Option<&Person>,
        staging_root: &Path,
        cursor: &mut Cursor,
        outcome: &mut PersonOutcome,
    ) -> Result<()> {
        let id = &person.id;
        let photos_total = entries.iter().filter(|e| e.is_photo).count();
        let mut photos_saved = 0;

        // Every person yields at least one event, even with zero files.
        self.progress.emit(&cursor.event(
            Some(id.clone()),
            None,
            Some(photos_total),
            ProgressMessage::new("import.person", format!("processing person {id}")),
        ));

        // 3a. Photo metadata: parse problems and dangling references are
        // tolerated, logged, and noted — never fatal.
        self.check_photo_references(reader, id, outcome);

        // 3b. Stream relevant files into the staging area.
        let stage_dir = staging_root.join(archive::person_dir(id));
        let mut staged: Vec<(PathBuf, String)> = Vec::new();
        for entry in entries {
            let target = stage_dir.join(&entry.rel);
            if let Some(parent) = target.parent() {
                self.files.ensure_dir(parent)?;
            }

            let mut out = File::create(&target)
                .map_err(|e| Error::op("create_staging_file", format!("{}: {e}", entry.rel)))?;
            let copied = reader.read_entry(&entry.name, &mut out)?;

            cursor.processed_files += 1;
            cursor.processed_bytes += copied;
            if entry.is_photo {
                photos_saved += 1;
            }
            staged.push((target, entry.rel.clone()));

            self.progress.emit(&cursor.event(
                Some(id.clone()),
                Some(photos_saved),
                Some(photos_total),
                ProgressMessage::new("import.file", format!("saved {}", entry.name)),
            ));
        }

        // 3c. Merge metadata into the store. Caught and logged, not
        // rethrown: the staged files are still moved below.
        let mut record = existing.map_or_else(|| person.clone().into_person(), Person::clone);
        if existing.is_some() {
            person.merge_into(&mut record);
        }
        self.progress.emit(&cursor.event(
            Some(id.clone()),
            None,
            None,
            ProgressMessage::new(ImportStage::Merging.key(), format!("merging person {id}")),
        ));
        if let Err(e) = self.store.upsert(&record) {
            tracing::warn!(person = %id, "metadata upsert failed: {e}");
            outcome.fail(format!("metadata upsert failed: {e}"));
        }

        // 3d. Move staged files into the live person directory. Non-atomic;
        // a partial copy is logged and recorded, not fatal.
        let live_dir = self.config.data_dir.join(archive::person_dir(id));
        for (source, rel) in &staged {
            let target = live_dir.join(rel);
            let placed = target
                .parent()
                .map_or(Ok(()), |parent| self.files.ensure_dir(parent))
                .and_then(|()| self.files.copy_file(source, &target));
            if let Err(e) = placed {
                tracing::warn!(person = %id, file = %rel, "partial copy into store: {e}");
                outcome.fail(format!("partial copy: {rel}: {e}"));
            }
        }

        Ok(())
    }

    /// Parses `photos.json` and notes referenced files missing from the
    /// archive. All problems here are the tolerated tier.
    fn check_photo_references(
        &self,
        reader: &mut ZipReader,
        id: &PersonId,
        outcome: &mut PersonOutcome,
    ) {
        let meta_entry = archive::photos_meta_entry(id);
        if !reader.has_entry(&meta_entry) {
            return;
        }

        let metas: Vec<PhotoMeta> = match reader
            .read_entry_string(&meta_entry)
            .and_then(|json| serde_json::from_str(&json).map_err(|e| Error::op("parse_photos_meta", e)))
        {
            Ok(metas) => metas,
            Err(e) => {
                tracing::warn!(person = %id, "malformed photos.json: {e}");
                outcome.note(format!("malformed photos.json: {e}"));
                return;
            },
        };

        for meta in &metas {
            if !reader.has_entry(&archive::photo_entry(id, &meta.filename)) {
                tracing::warn!(
                    person = %id,
                    photo = %meta.filename,
                    "referenced photo missing from archive"
                );
                outcome.note(format!(
                    "referenced photo missing from archive: {}",
                    meta.filename
                ));
            }
        }
    }

    fn emit_stage(&self, stage: ImportStage, text: impl Into<String>) {
        self.progress.emit(&ProgressEvent::stage(stage.key(), text));
    }
}

/// Run-level progress counters threaded through the person loop.
struct Cursor {
    person_index: usize,
    person_total: usize,
    processed_files: usize,
    total_files: usize,
    processed_bytes: u64,
    total_bytes: u64,
}

impl Cursor {
    fn event(
        &self,
        person_id: Option<PersonId>,
        photos_saved: Option<usize>,
        photos_total: Option<usize>,
        message: ProgressMessage,
    ) -> ProgressEvent {
        ProgressEvent {
            current: self.person_index,
            total: self.person_total,
            person_id,
            processed_files: self.processed_files,
            total_files: self.total_files,
            percent: ProgressEvent::percent_of(self.processed_bytes, self.total_bytes),
            photos_saved,
            photos_total,
            message: message.text.clone(),
            messages: vec![message],
        }
    }
}

/// Resolves a decision into the set of ids to apply, `None` for cancel.
fn applied_ids(diff: &DiffOutcome, decision: &Decision) -> Option<HashSet<PersonId>> {
    match decision {
        Decision::Cancel => None,
        Decision::New => Some(diff.to_add.iter().cloned().collect()),
        Decision::All => Some(
            diff.to_add
                .iter()
                .chain(&diff.to_update)
                .cloned()
                .collect(),
        ),
        Decision::Selected(ids) => {
            let eligible: HashSet<&PersonId> =
                diff.to_add.iter().chain(&diff.to_update).collect();
            Some(
                ids.iter()
                    .filter(|id| eligible.contains(id))
                    .cloned()
                    .collect(),
            )
        },
    }
}

/// Lists the relevant archive files for a person: bio, avatar, and
/// everything under `photos/`, in that order.
fn relevant_entries(reader: &ZipReader, id: &PersonId) -> Vec<RelevantEntry> {
    let bio = archive::bio_entry(id);
    let avatar = archive::avatar_entry(id);
    let photo_prefix = format!("{}/{}/", archive::person_dir(id), archive::PHOTOS_DIR);

    let mut out = Vec::new();
    for (name, rel, is_photo) in [
        (bio, archive::BIO_FILE.to_string(), false),
        (avatar, archive::AVATAR_FILE.to_string(), false),
    ] {
        if let Some(size) = reader.entry_size(&name) {
            out.push(RelevantEntry {
                name,
                rel,
                size,
                is_photo,
            });
        }
    }

    for entry in reader.entries() {
        if let Some(filename) = entry.name.strip_prefix(&photo_prefix) {
            if !filename.is_empty() && !filename.contains('/') {
                out.push(RelevantEntry {
                    name: entry.name.clone(),
                    rel: format!("{}/{filename}", archive::PHOTOS_DIR),
                    size: entry.size,
                    is_photo: true,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff_with(to_add: &[&str], to_update: &[&str]) -> DiffOutcome {
        DiffOutcome {
            to_add: to_add.iter().map(|s| PersonId::new(*s)).collect(),
            to_update: to_update.iter().map(|s| PersonId::new(*s)).collect(),
            ..DiffOutcome::default()
        }
    }

    #[test]
    fn test_applied_ids_all() {
        let diff = diff_with(&["200"], &["100"]);
        let set = applied_ids(&diff, &Decision::All).unwrap();
        assert!(set.contains(&PersonId::new("100")));
        assert!(set.contains(&PersonId::new("200")));
    }

    #[test]
    fn test_applied_ids_new_excludes_updates() {
        let diff = diff_with(&["200"], &["100"]);
        let set = applied_ids(&diff, &Decision::New).unwrap();
        assert!(set.contains(&PersonId::new("200")));
        assert!(!set.contains(&PersonId::new("100")));
    }

    #[test]
    fn test_applied_ids_selected_filters_to_eligible() {
        let diff = diff_with(&["200"], &["100"]);
        let set = applied_ids(
            &diff,
            &Decision::Selected(vec![PersonId::new("100"), PersonId::new("999")]),
        )
        .unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains(&PersonId::new("100")));
    }

    #[test]
    fn test_applied_ids_cancel_is_none() {
        let diff = diff_with(&["200"], &["100"]);
        assert!(applied_ids(&diff, &Decision::Cancel).is_none());
    }

    #[test]
    fn test_stage_keys_are_stable() {
        assert_eq!(ImportStage::Opening.key(), "import.opening");
        assert_eq!(ImportStage::AwaitingDecision.key(), "import.awaiting_decision");
        assert_eq!(ImportStage::Aborted.key(), "import.aborted");
    }
}
