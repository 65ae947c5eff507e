//! Diff CLI command.

use crate::archive::{ManifestValidator, ZipReader};
use crate::config::KinshipConfig;
use crate::store::{FilesystemStore, RecordStore};
use crate::sync::DiffEngine;
use crate::{Error, Result};
use std::path::Path;

/// Runs the diff command: previews an archive against the store without
/// writing anything.
///
/// # Errors
///
/// Returns an error if the archive or its manifest cannot be read.
pub fn cmd_diff(config: &KinshipConfig, archive: &Path) -> Result<()> {
    let mut reader = ZipReader::open(archive)?;
    let json = reader
        .manifest_json()?
        .ok_or_else(|| Error::ArchiveUnreadable {
            path: archive.display().to_string(),
            cause: "manifest missing".to_string(),
        })?;
    let decoded = ManifestValidator::new().decode(&json)?;
    for issue in &decoded.issues {
        println!("manifest issue at {}: {}", issue.field, issue.message);
    }

    let store = FilesystemStore::new(&config.data_dir);
    let store_people = store.read_all()?;
    let diff = DiffEngine::new().compute(&decoded.people, &store_people);

    println!(
        "{} new, {} updated, {} unchanged",
        diff.to_add.len(),
        diff.to_update.len(),
        diff.unchanged.len()
    );
    println!("{}", diff.summary);
    Ok(())
}
