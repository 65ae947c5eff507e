//! Export CLI command.

use crate::archive::ZipArchiver;
use crate::config::KinshipConfig;
use crate::store::{FilesystemStore, RecordStore};
use crate::sync::{ExportPipeline, FixedDestination, ProgressReporter};
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// Runs the export command.
///
/// With `ids` empty, the whole store is exported; otherwise only the named
/// people (their records still reference relatives by id).
///
/// # Errors
///
/// Returns an error if the store cannot be read or the archive cannot be
/// written.
pub fn cmd_export(config: &KinshipConfig, dest: &Path, ids: &[String]) -> Result<()> {
    let store = Arc::new(FilesystemStore::new(&config.data_dir));
    let mut people = store.read_all()?;
    if !ids.is_empty() {
        people.retain(|p| ids.iter().any(|id| id == p.id.as_str()));
    }

    if people.is_empty() {
        println!("Nothing to export");
        return Ok(());
    }

    let pipeline = ExportPipeline::new(store, Arc::new(ZipArchiver::new()), config.clone())
        .with_progress(ProgressReporter::from_fn(|event| {
            println!("[{:>5.1}%] {}", event.percent, event.message);
        }));

    match pipeline.run(&people, &FixedDestination(dest.to_path_buf()))? {
        Some(path) => println!("Exported {} person(s) to {}", people.len(), path.display()),
        None => println!("Export cancelled"),
    }
    Ok(())
}
