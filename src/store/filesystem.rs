//! Filesystem-backed record store.
//!
//! Stores the person manifest as `genealogy-data.json` under the data
//! directory and mirrors the archive's per-person directory layout for
//! files (`people/<id>/{bio.md, avatar.jpg, photos/...}`).
//!
//! # Security
//!
//! Person ids become directory names, so they are validated against path
//! traversal before any path is formed: only alphanumeric characters,
//! dashes, and underscores are allowed.

use crate::archive::{MANIFEST_NAME, PEOPLE_DIR};
use crate::models::{Person, PersonId};
use crate::store::{FileStore, RecordStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serializable manifest format for the store's backing file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreManifest {
    people: Vec<Person>,
}

/// Filesystem-backed record store.
pub struct FilesystemStore {
    /// Data directory holding the manifest and person directories.
    root: PathBuf,
}

impl FilesystemStore {
    /// Creates a store over the given data directory.
    ///
    /// The directory is created on first write, not here; a store over a
    /// missing directory reads as empty.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a store with checked directory creation.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::op("create_store_dir", e))?;
        Ok(Self { root })
    }

    /// Returns the data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the backing manifest file.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    /// Returns the directory holding a person's files.
    ///
    /// # Errors
    ///
    /// Returns an error if the id contains characters unsafe for a
    /// directory name.
    pub fn person_dir(&self, id: &PersonId) -> Result<PathBuf> {
        if !is_safe_id(id.as_str()) {
            return Err(Error::InvalidInput(format!(
                "person id contains invalid characters: {id}"
            )));
        }
        Ok(self.root.join(PEOPLE_DIR).join(id.as_str()))
    }

    fn read_manifest(&self) -> Result<StoreManifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(StoreManifest::default());
        }

        let json = fs::read_to_string(&path).map_err(|e| Error::op("read_store_manifest", e))?;
        serde_json::from_str(&json).map_err(|e| Error::op("parse_store_manifest", e))
    }

    fn write_manifest(&self, manifest: &StoreManifest) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| Error::op("create_store_dir", e))?;

        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| Error::op("serialize_store_manifest", e))?;
        fs::write(self.manifest_path(), json).map_err(|e| Error::op("write_store_manifest", e))
    }
}

impl RecordStore for FilesystemStore {
    fn read_all(&self) -> Result<Vec<Person>> {
        Ok(self.read_manifest()?.people)
    }

    fn upsert(&self, person: &Person) -> Result<()> {
        let mut manifest = self.read_manifest()?;
        match manifest.people.iter_mut().find(|p| p.id == person.id) {
            Some(existing) => *existing = person.clone(),
            None => manifest.people.push(person.clone()),
        }
        self.write_manifest(&manifest)
    }

    fn save_all(&self, people: &[Person]) -> Result<()> {
        self.write_manifest(&StoreManifest {
            people: people.to_vec(),
        })
    }
}

impl FileStore for FilesystemStore {
    fn ensure_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| Error::op("ensure_dir", e))
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).map_err(|e| Error::op("write_text", e))
    }

    fn write_blob(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).map_err(|e| Error::op("write_blob", e))
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy(from, to).map_err(|e| Error::op("copy_file", e))
    }

    fn delete(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|e| Error::op("delete_dir", e))
        } else {
            fs::remove_file(path).map_err(|e| Error::op("delete_file", e))
        }
    }
}

/// Checks if a person id is safe to use as a directory name.
pub(crate) fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 255
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_person(id: &str, bio: &str) -> Person {
        Person::new(id).with_name(format!("Person {id}")).with_bio(bio)
    }

    #[test]
    fn test_empty_store_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path().join("missing"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        store.upsert(&test_person("100", "first")).unwrap();
        store.upsert(&test_person("200", "second")).unwrap();
        store.upsert(&test_person("100", "rewritten")).unwrap();

        let people = store.read_all().unwrap();
        assert_eq!(people.len(), 2);
        let p100 = people.iter().find(|p| p.id.as_str() == "100").unwrap();
        assert_eq!(p100.bio, "rewritten");
    }

    #[test]
    fn test_save_all_replaces_population() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        store.upsert(&test_person("100", "old")).unwrap();
        store.save_all(&[test_person("300", "only")]).unwrap();

        let people = store.read_all().unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id.as_str(), "300");
    }

    #[test]
    fn test_person_dir_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        assert!(store.person_dir(&PersonId::new("../evil")).is_err());
        assert!(store.person_dir(&PersonId::new("a/b")).is_err());
        assert!(store.person_dir(&PersonId::new("")).is_err());

        let ok = store.person_dir(&PersonId::new("104")).unwrap();
        assert!(ok.ends_with("people/104"));
    }

    #[test]
    fn test_delete_missing_path_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());
        store.delete(&dir.path().join("nothing-here")).unwrap();
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        let sub = dir.path().join("people").join("104");
        store.ensure_dir(&sub).unwrap();
        store.write_text(&sub.join("bio.md"), "# Ada\n").unwrap();
        store.write_blob(&sub.join("avatar.jpg"), &[0xff, 0xd8]).unwrap();

        let copied = store
            .copy_file(&sub.join("bio.md"), &sub.join("bio-copy.md"))
            .unwrap();
        assert_eq!(copied, 6);

        store.delete(&sub).unwrap();
        assert!(!sub.exists());
    }
}
