//! Archive export pipeline.
//!
//! Serializes the record store into a staging tree mirroring the archive
//! layout and hands the staged file list to the [`Archiver`] collaborator.
//! Collection is best-effort and favors completeness over correctness: a
//! missing file never aborts the run, and a person with zero collected
//! artifacts is pruned entirely from the output.

use crate::archive::{
    self, Archiver, ArchiverProgressCallback, StagedFile,
};
use crate::config::KinshipConfig;
use crate::models::{Person, PersonId, ProgressEvent, ProgressMessage};
use crate::store::{is_safe_id, FileStore};
use crate::sync::progress::ProgressReporter;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Inline image references in bio markup: `![alt](path)`.
static INLINE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)\)").expect("valid regex"));

/// Collaborator that chooses where the archive lands.
///
/// `None` means the user canceled, which is distinct from an error: the
/// export returns `Ok(None)` with no staging performed.
pub trait DestinationPicker {
    /// Picks the destination path, or `None` to cancel.
    fn pick(&self) -> Option<PathBuf>;
}

impl<F> DestinationPicker for F
where
    F: Fn() -> Option<PathBuf>,
{
    fn pick(&self) -> Option<PathBuf> {
        self()
    }
}

/// Picker that always answers with a fixed path. Used by the CLI, where
/// the destination is an argument rather than a dialog.
pub struct FixedDestination(pub PathBuf);

impl DestinationPicker for FixedDestination {
    fn pick(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Service that exports the record store into a snapshot archive.
pub struct ExportPipeline {
    files: Arc<dyn FileStore>,
    archiver: Arc<dyn Archiver>,
    config: KinshipConfig,
    progress: ProgressReporter,
}

impl ExportPipeline {
    /// Creates a new export pipeline.
    #[must_use]
    pub fn new(
        files: Arc<dyn FileStore>,
        archiver: Arc<dyn Archiver>,
        config: KinshipConfig,
    ) -> Self {
        Self {
            files,
            archiver,
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

    /// Exports the given people into an archive at a destination chosen by
    /// the picker.
    ///
    /// Returns `Ok(None)` if the destination choice was canceled.
    ///
    /// # Errors
    ///
    /// Returns an error if staging cannot be created, the manifest cannot
    /// be serialized, or the archiver fails.
    #[instrument(skip(self, people, picker), fields(operation = "export.run"))]
    pub fn run(
        &self,
        people: &[Person],
        picker: &dyn DestinationPicker,
    ) -> Result<Option<PathBuf>> {
        let start = Instant::now();

        let Some(dest) = picker.pick() else {
            tracing::info!("export cancelled at destination choice");
            metrics::counter!("archive_export_total", "status" => "cancelled").increment(1);
            return Ok(None);
        };

        let staging_root = self
            .config
            .staging_dir
            .join(format!("export-{}", uuid::Uuid::new_v4()));
        self.files.ensure_dir(&staging_root)?;

        // Staging cleanup is unconditional, success or failure.
        let result = self.stage_and_archive(people, &staging_root, &dest);
        if let Err(e) = self.files.delete(&staging_root) {
            tracing::warn!("failed to remove staging area: {e}");
        }

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("archive_export_total", "status" => status).increment(1);
        metrics::histogram!("archive_export_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        result.map(Some)
    }

    fn stage_and_archive(
        &self,
        people: &[Person],
        staging_root: &Path,
        dest: &Path,
    ) -> Result<PathBuf> {
        let mut staged = Vec::new();

        // Manifest first: one record for every person, pruned or not.
        let manifest_path = staging_root.join(archive::MANIFEST_NAME);
        let manifest = serde_json::to_string_pretty(&serde_json::json!({ "people": people }))
            .map_err(|e| Error::op("serialize_manifest", e))?;
        self.files.write_text(&manifest_path, &manifest)?;
        staged.push(StagedFile::new(&manifest_path, archive::MANIFEST_NAME));

        let mut pruned = 0usize;
        for (index, person) in people.iter().enumerate() {
            self.progress.emit(&ProgressEvent {
                current: index + 1,
                total: people.len(),
                person_id: Some(person.id.clone()),
                message: format!("collecting person {}", person.id),
                messages: vec![ProgressMessage::new(
                    "export.person",
                    format!("collecting person {}", person.id),
                )],
                ..ProgressEvent::default()
            });

            let collected = self.collect_person(person, staging_root);
            if collected.is_empty() {
                pruned += 1;
                tracing::debug!(person = %person.id, "no artifacts collected, pruning");
            } else {
                staged.extend(collected);
            }
        }
        if pruned > 0 {
            tracing::info!(pruned, "pruned persons with no artifacts");
        }

        let reporter = self.progress.clone();
        let callback: ArchiverProgressCallback = Box::new(move |p| {
            reporter.emit(&ProgressEvent {
                percent: ProgressEvent::percent_of(p.processed_bytes, p.total_bytes),
                message: format!("archiving {}", p.current_file),
                messages: vec![ProgressMessage::new(
                    "export.archiving",
                    format!("archiving {}", p.current_file),
                )
                .with_meta(serde_json::json!({
                    "processedBytes": p.processed_bytes,
                    "totalBytes": p.total_bytes,
                    "currentFile": p.current_file,
                }))],
                ..ProgressEvent::default()
            });
        });

        let path = self.archiver.create(&staged, dest, Some(&callback))?;
        tracing::info!(
            archive = %path.display(),
            files = staged.len(),
            "export finished"
        );
        Ok(path)
    }

    /// Collects one person's artifacts into the staging tree.
    ///
    /// Every step swallows its own failure with a logged warning; the
    /// returned list holds whatever could be collected.
    fn collect_person(&self, person: &Person, staging_root: &Path) -> Vec<StagedFile> {
        let id = &person.id;
        if !is_safe_id(id.as_str()) {
            tracing::warn!(%id, "skipping person with unsafe id");
            return Vec::new();
        }

        let live_dir = self.config.data_dir.join(archive::person_dir(id));
        let stage_dir = staging_root.join(archive::person_dir(id));
        let mut staged = Vec::new();
        let mut seen_entries: HashSet<String> = HashSet::new();

        if let Err(e) = self.collect_avatar(id, &live_dir, &stage_dir, &mut staged) {
            tracing::warn!(person = %id, "avatar skipped: {e}");
        }
        if let Err(e) = self.collect_bio(person, &live_dir, &stage_dir, &mut staged, &mut seen_entries)
        {
            tracing::warn!(person = %id, "bio skipped: {e}");
        }
        if let Err(e) =
            self.collect_photos(person, &live_dir, &stage_dir, &mut staged, &mut seen_entries)
        {
            tracing::warn!(person = %id, "photo metadata skipped: {e}");
        }

        staged
    }

    /// Avatar, size-gated to exclude placeholder images.
    fn collect_avatar(
        &self,
        id: &PersonId,
        live_dir: &Path,
        stage_dir: &Path,
        staged: &mut Vec<StagedFile>,
    ) -> Result<()> {
        let source = live_dir.join(archive::AVATAR_FILE);
        if !source.exists() {
            return Ok(());
        }

        let size = std::fs::metadata(&source)
            .map_err(|e| Error::op("stat_avatar", e))?
            .len();
        if size < self.config.min_avatar_bytes {
            tracing::debug!(person = %id, size, "avatar below placeholder gate, skipping");
            return Ok(());
        }

        let target = stage_dir.join(archive::AVATAR_FILE);
        self.files.ensure_dir(stage_dir)?;
        self.files.copy_file(&source, &target)?;
        staged.push(StagedFile::new(target, archive::avatar_entry(id)));
        Ok(())
    }

    /// Bio text plus every image referenced inline in it.
    fn collect_bio(
        &self,
        person: &Person,
        live_dir: &Path,
        stage_dir: &Path,
        staged: &mut Vec<StagedFile>,
        seen_entries: &mut HashSet<String>,
    ) -> Result<()> {
        if person.bio.is_empty() {
            return Ok(());
        }
        let id = &person.id;

        let target = stage_dir.join(archive::BIO_FILE);
        self.files.ensure_dir(stage_dir)?;
        self.files.write_text(&target, &person.bio)?;
        staged.push(StagedFile::new(target, archive::bio_entry(id)));

        for capture in INLINE_IMAGE.captures_iter(&person.bio) {
            let reference = &capture[1];
            let Some(filename) = reference.rsplit('/').next() else {
                continue;
            };
            if let Err(e) =
                self.collect_photo_file(id, filename, live_dir, stage_dir, staged, seen_entries)
            {
                tracing::warn!(person = %id, photo = filename, "inline image skipped: {e}");
            }
        }
        Ok(())
    }

    /// Photo metadata plus each referenced photo file.
    fn collect_photos(
        &self,
        person: &Person,
        live_dir: &Path,
        stage_dir: &Path,
        staged: &mut Vec<StagedFile>,
        seen_entries: &mut HashSet<String>,
    ) -> Result<()> {
        if person.photos.is_empty() {
            return Ok(());
        }
        let id = &person.id;

        let json = serde_json::to_string_pretty(&person.photos)
            .map_err(|e| Error::op("serialize_photos_meta", e))?;
        let target = stage_dir.join(archive::PHOTOS_META_FILE);
        self.files.ensure_dir(stage_dir)?;
        self.files.write_text(&target, &json)?;
        staged.push(StagedFile::new(target, archive::photos_meta_entry(id)));

        for photo in &person.photos {
            if let Err(e) = self.collect_photo_file(
                id,
                &photo.filename,
                live_dir,
                stage_dir,
                staged,
                seen_entries,
            ) {
                tracing::warn!(person = %id, photo = %photo.filename, "photo skipped: {e}");
            }
        }
        Ok(())
    }

    fn collect_photo_file(
        &self,
        id: &PersonId,
        filename: &str,
        live_dir: &Path,
        stage_dir: &Path,
        staged: &mut Vec<StagedFile>,
        seen_entries: &mut HashSet<String>,
    ) -> Result<()> {
        if filename.is_empty() || filename.contains("..") {
            return Err(Error::InvalidInput(format!(
                "unusable photo filename: '{filename}'"
            )));
        }

        let entry = archive::photo_entry(id, filename);
        if !seen_entries.insert(entry.clone()) {
            return Ok(());
        }

        let source = live_dir.join(archive::PHOTOS_DIR).join(filename);
        if !source.exists() {
            return Err(Error::op(
                "collect_photo",
                format!("{} not found", source.display()),
            ));
        }

        let photos_dir = stage_dir.join(archive::PHOTOS_DIR);
        self.files.ensure_dir(&photos_dir)?;
        let target = photos_dir.join(filename);
        self.files.copy_file(&source, &target)?;
        staged.push(StagedFile::new(target, entry));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_image_regex() {
        let bio = "Born 1901.\n![wedding](photos/wedding.jpg) and ![](harvest.png)\n";
        let refs: Vec<&str> = INLINE_IMAGE
            .captures_iter(bio)
            .map(|c| c.get(1).unwrap().as_str())
            .collect();
        assert_eq!(refs, vec!["photos/wedding.jpg", "harvest.png"]);
    }

    #[test]
    fn test_fixed_destination_picker() {
        let picker = FixedDestination(PathBuf::from("/tmp/out.zip"));
        assert_eq!(picker.pick(), Some(PathBuf::from("/tmp/out.zip")));
    }

    #[test]
    fn test_closure_picker_can_cancel() {
        let picker = || None;
        assert_eq!(DestinationPicker::pick(&picker), None);
    }
}
