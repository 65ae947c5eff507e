//! Portable snapshot archives.
//!
//! An archive is a zip container with one manifest at the root and a
//! directory per person:
//!
//! ```text
//! genealogy-data.json          {"people": [Person, ...]}
//! people/<id>/bio.md
//! people/<id>/avatar.jpg
//! people/<id>/photos.json
//! people/<id>/photos/<filename>
//! ```
//!
//! The same layout is mirrored by the on-disk record store, so the path
//! helpers here are shared by the reader, the archiver, both pipelines and
//! the store.

mod reader;
mod validation;
mod writer;

pub use reader::{ArchiveEntry, ArchiveSource, ZipReader};
pub use validation::{
    ArchivedPerson, ManifestDecode, ManifestValidator, ValidationIssue, ValidationSeverity,
};
pub use writer::{Archiver, ArchiverProgress, ArchiverProgressCallback, StagedFile, ZipArchiver};

use crate::models::PersonId;

/// Manifest entry name at the archive root.
pub const MANIFEST_NAME: &str = "genealogy-data.json";

/// Directory holding one subdirectory per person.
pub const PEOPLE_DIR: &str = "people";

/// Biography entry name inside a person directory.
pub const BIO_FILE: &str = "bio.md";

/// Avatar entry name inside a person directory.
pub const AVATAR_FILE: &str = "avatar.jpg";

/// Photo metadata entry name inside a person directory.
pub const PHOTOS_META_FILE: &str = "photos.json";

/// Photo file directory inside a person directory.
pub const PHOTOS_DIR: &str = "photos";

/// Returns the person directory prefix, e.g. `people/104`.
#[must_use]
pub fn person_dir(id: &PersonId) -> String {
    format!("{PEOPLE_DIR}/{id}")
}

/// Returns the bio entry path for a person.
#[must_use]
pub fn bio_entry(id: &PersonId) -> String {
    format!("{PEOPLE_DIR}/{id}/{BIO_FILE}")
}

/// Returns the avatar entry path for a person.
#[must_use]
pub fn avatar_entry(id: &PersonId) -> String {
    format!("{PEOPLE_DIR}/{id}/{AVATAR_FILE}")
}

/// Returns the photo metadata entry path for a person.
#[must_use]
pub fn photos_meta_entry(id: &PersonId) -> String {
    format!("{PEOPLE_DIR}/{id}/{PHOTOS_META_FILE}")
}

/// Returns the entry path of one photo file for a person.
#[must_use]
pub fn photo_entry(id: &PersonId, filename: &str) -> String {
    format!("{PEOPLE_DIR}/{id}/{PHOTOS_DIR}/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_paths() {
        let id = PersonId::new("104");
        assert_eq!(person_dir(&id), "people/104");
        assert_eq!(bio_entry(&id), "people/104/bio.md");
        assert_eq!(avatar_entry(&id), "people/104/avatar.jpg");
        assert_eq!(photos_meta_entry(&id), "people/104/photos.json");
        assert_eq!(photo_entry(&id, "wedding.jpg"), "people/104/photos/wedding.jpg");
    }
}
