//! Streaming archive reading.
//!
//! [`ZipReader`] opens a snapshot container and streams entry contents
//! without buffering the whole archive. It is a single-reader resource:
//! entry reads borrow the reader mutably, which is what serializes
//! per-person processing inside a pipeline run.

use crate::models::PersonId;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use zip::ZipArchive;

use super::{MANIFEST_NAME, PEOPLE_DIR};

/// Size guard for entries read into memory as text (manifest, photos.json).
/// Streamed entries have no limit.
const MAX_TEXT_ENTRY: u64 = 16 * 1024 * 1024;

/// One entry in the archive listing.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Entry name relative to the archive root (prefix stripped).
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// Source of archive entries.
///
/// Entry names are logical paths relative to the archive root; a container
/// that was re-zipped with a single top-level folder is normalized by the
/// implementation, so consumers always use the paths from
/// [`crate::archive::bio_entry`] and friends.
pub trait ArchiveSource {
    /// Returns the entry listing (files only, directories excluded).
    fn entries(&self) -> &[ArchiveEntry];

    /// Returns whether an entry exists.
    fn has_entry(&self, name: &str) -> bool;

    /// Returns an entry's uncompressed size.
    fn entry_size(&self, name: &str) -> Option<u64>;

    /// Streams an entry into the writer, returning the bytes copied.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or the copy fails.
    fn read_entry(&mut self, name: &str, out: &mut dyn Write) -> Result<u64>;

    /// Reads a small text entry into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing, oversized, or not UTF-8.
    fn read_entry_string(&mut self, name: &str) -> Result<String>;
}

/// Zip-backed archive source.
#[derive(Debug)]
pub struct ZipReader {
    archive: ZipArchive<File>,
    /// Top-level folder prefix discovered from the manifest location,
    /// empty for archives with the manifest at the root.
    prefix: String,
    entries: Vec<ArchiveEntry>,
    sizes: HashMap<String, u64>,
}

impl ZipReader {
    /// Opens an archive and normalizes its listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArchiveUnreadable`] if the file cannot be opened or
    /// is not a zip container.
    pub fn open(path: &Path) -> Result<Self> {
        let unreadable = |cause: String| Error::ArchiveUnreadable {
            path: path.display().to_string(),
            cause,
        };

        let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| unreadable(e.to_string()))?;

        let mut raw = Vec::new();
        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| unreadable(e.to_string()))?;
            if !entry.is_dir() {
                raw.push((entry.name().to_string(), entry.size()));
            }
        }

        let prefix = manifest_prefix(raw.iter().map(|(name, _)| name.as_str()));

        let mut entries = Vec::new();
        let mut sizes = HashMap::new();
        for (name, size) in raw {
            if let Some(logical) = name.strip_prefix(&prefix) {
                sizes.insert(logical.to_string(), size);
                entries.push(ArchiveEntry {
                    name: logical.to_string(),
                    size,
                });
            }
        }

        Ok(Self {
            archive,
            prefix,
            entries,
            sizes,
        })
    }

    /// Reads the manifest entry, if the archive has one.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing manifest cannot be read.
    pub fn manifest_json(&mut self) -> Result<Option<String>> {
        if !self.has_entry(MANIFEST_NAME) {
            return Ok(None);
        }
        self.read_entry_string(MANIFEST_NAME).map(Some)
    }

    /// Derives person ids from `people/<id>/` entries, first-seen order.
    ///
    /// The fallback worklist when the manifest is missing; an empty result
    /// means the archive has no usable content at all.
    #[must_use]
    pub fn person_ids_from_listing(&self) -> Vec<PersonId> {
        let want = format!("{PEOPLE_DIR}/");
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for entry in &self.entries {
            let Some(rest) = entry.name.strip_prefix(&want) else {
                continue;
            };
            let Some((id, _)) = rest.split_once('/') else {
                continue;
            };
            if !id.is_empty() && seen.insert(id.to_string()) {
                ids.push(PersonId::new(id));
            }
        }
        ids
    }
}

impl ArchiveSource for ZipReader {
    fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    fn has_entry(&self, name: &str) -> bool {
        self.sizes.contains_key(name)
    }

    fn entry_size(&self, name: &str) -> Option<u64> {
        self.sizes.get(name).copied()
    }

    fn read_entry(&mut self, name: &str, out: &mut dyn Write) -> Result<u64> {
        let full = format!("{}{name}", self.prefix);
        let mut entry = self
            .archive
            .by_name(&full)
            .map_err(|e| Error::op("open_archive_entry", format!("{name}: {e}")))?;
        io::copy(&mut entry, out).map_err(|e| Error::op("read_archive_entry", format!("{name}: {e}")))
    }

    fn read_entry_string(&mut self, name: &str) -> Result<String> {
        let size = self
            .entry_size(name)
            .ok_or_else(|| Error::op("open_archive_entry", format!("{name}: not found")))?;
        if size > MAX_TEXT_ENTRY {
            return Err(Error::InvalidInput(format!(
                "entry '{name}' exceeds maximum text size of {MAX_TEXT_ENTRY} bytes (got {size})"
            )));
        }

        let full = format!("{}{name}", self.prefix);
        let mut entry = self
            .archive
            .by_name(&full)
            .map_err(|e| Error::op("open_archive_entry", format!("{name}: {e}")))?;
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| Error::op("read_archive_entry", format!("{name}: {e}")))?;
        Ok(text)
    }
}

/// Finds the folder prefix under which the manifest lives.
///
/// Archives written by the export pipeline keep the manifest at the root;
/// archives re-zipped by hand often gain one wrapping folder. Anything
/// deeper is not recognized and falls through to the listing fallback.
fn manifest_prefix<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut fallback: Option<String> = None;
    for name in names {
        if name == MANIFEST_NAME {
            return String::new();
        }
        if let Some(prefix) = name.strip_suffix(&format!("/{MANIFEST_NAME}")) {
            if !prefix.contains('/') && fallback.is_none() {
                fallback = Some(format!("{prefix}/"));
            }
        }
    }
    fallback.unwrap_or_default()
}
