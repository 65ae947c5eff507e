//! Status CLI command.

use crate::config::KinshipConfig;
use crate::store::{FilesystemStore, RecordStore};
use crate::Result;
use std::collections::BTreeMap;

/// Runs the status command: prints record store statistics.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn cmd_status(config: &KinshipConfig) -> Result<()> {
    let store = FilesystemStore::new(&config.data_dir);
    let people = store.read_all()?;

    let photos: usize = people.iter().map(|p| p.photos.len()).sum();
    let with_bio = people.iter().filter(|p| !p.bio.is_empty()).count();

    let mut generations: BTreeMap<u32, usize> = BTreeMap::new();
    for person in &people {
        if let Some(generation) = person.id.generation() {
            *generations.entry(generation).or_default() += 1;
        }
    }

    println!("Store: {}", config.data_dir.display());
    println!("People: {} ({} with a bio)", people.len(), with_bio);
    println!("Photos: {photos}");
    for (generation, count) in &generations {
        println!("  generation {generation}: {count}");
    }
    Ok(())
}
