//! Person records and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a person.
///
/// By convention ids carry a generation-digit prefix followed by a sequence
/// number (`"104"` is the fourth person recorded in generation 1). The
/// engine treats ids as opaque; the convention only surfaces in
/// [`PersonId::generation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    /// Creates a new person ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the generation digit encoded in the ID, if the ID follows
    /// the numeric convention.
    #[must_use]
    pub fn generation(&self) -> Option<u32> {
        self.0.chars().next().and_then(|c| c.to_digit(10))
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PersonId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PersonId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata for a photo attached to a person.
///
/// Serialized camelCase to match the archive wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMeta {
    /// Unique photo identifier.
    pub id: String,
    /// Filename under the person's `photos/` directory.
    pub filename: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ids of people pictured.
    #[serde(default)]
    pub people: Vec<PersonId>,
    /// Id of the person who owns the original.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<PersonId>,
    /// Date the record was entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Date the photo was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_photo: Option<String>,
    /// Width / height ratio used by the gallery layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
}

impl PhotoMeta {
    /// Creates photo metadata with just an id and filename.
    #[must_use]
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            title: None,
            description: None,
            people: Vec::new(),
            owner: None,
            date: None,
            date_photo: None,
            aspect_ratio: None,
        }
    }
}

/// A canonical genealogical person record.
///
/// Relational fields form a graph the sync engine relies on but does not
/// validate; symmetry of `children`/`siblings`/`spouse` edges is maintained
/// by [`crate::models::RelationGraph`], not here. Serialized camelCase to
/// match the archive wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Unique identifier.
    pub id: PersonId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Father back-reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father: Option<PersonId>,
    /// Mother back-reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother: Option<PersonId>,
    /// Child ids, expected (not enforced) to mirror `father`/`mother`.
    #[serde(default)]
    pub children: Vec<PersonId>,
    /// Sibling ids, expected (not enforced) to be symmetric.
    #[serde(default)]
    pub siblings: Vec<PersonId>,
    /// Spouse ids, expected (not enforced) to be symmetric.
    #[serde(default)]
    pub spouse: Vec<PersonId>,
    /// Biography in lightweight markup.
    #[serde(default)]
    pub bio: String,
    /// Photo metadata list.
    #[serde(default)]
    pub photos: Vec<PhotoMeta>,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last edit timestamp.
    #[serde(default = "Utc::now")]
    pub edited_at: DateTime<Utc>,
}

impl Person {
    /// Creates an empty person record with the given id.
    #[must_use]
    pub fn new(id: impl Into<PersonId>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: String::new(),
            father: None,
            mother: None,
            children: Vec::new(),
            siblings: Vec::new(),
            spouse: Vec::new(),
            bio: String::new(),
            photos: Vec::new(),
            created_at: now,
            edited_at: now,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the biography text.
    #[must_use]
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    /// Adds a photo metadata entry.
    #[must_use]
    pub fn with_photo(mut self, photo: PhotoMeta) -> Self {
        self.photos.push(photo);
        self
    }

    /// Returns the set of photo filenames, order-independent.
    ///
    /// This is the set the diff engine compares; duplicates collapse.
    #[must_use]
    pub fn photo_filenames(&self) -> BTreeSet<&str> {
        self.photos.iter().map(|p| p.filename.as_str()).collect()
    }

    /// Stamps the record as edited now.
    pub fn touch(&mut self) {
        self.edited_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_id_preserves_string() {
        let id = PersonId::new("104");
        assert_eq!(id.as_str(), "104");
        assert_eq!(id.to_string(), "104");
    }

    #[test]
    fn test_person_id_generation() {
        assert_eq!(PersonId::new("104").generation(), Some(1));
        assert_eq!(PersonId::new("237").generation(), Some(2));
        assert_eq!(PersonId::new("x07").generation(), None);
    }

    #[test]
    fn test_person_serializes_camel_case() {
        let person = Person::new("104").with_name("Ada").with_bio("Born 1901.");
        let json = serde_json::to_string(&person).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"editedAt\""));
        assert!(!json.contains("\"father\""), "absent options are skipped");
    }

    #[test]
    fn test_person_deserializes_sparse_record() {
        let person: Person = serde_json::from_str(r#"{"id":"104"}"#).unwrap();
        assert_eq!(person.id.as_str(), "104");
        assert!(person.name.is_empty());
        assert!(person.photos.is_empty());
    }

    #[test]
    fn test_photo_filenames_is_a_set() {
        let person = Person::new("104")
            .with_photo(PhotoMeta::new("p1", "a.jpg"))
            .with_photo(PhotoMeta::new("p2", "b.jpg"))
            .with_photo(PhotoMeta::new("p3", "a.jpg"));
        let names = person.photo_filenames();
        assert_eq!(names.len(), 2);
        assert!(names.contains("a.jpg"));
        assert!(names.contains("b.jpg"));
    }

    #[test]
    fn test_photo_meta_camel_case_fields() {
        let mut photo = PhotoMeta::new("p1", "a.jpg");
        photo.date_photo = Some("1932-05-01".to_string());
        photo.aspect_ratio = Some(1.5);
        let json = serde_json::to_string(&photo).unwrap();
        assert!(json.contains("\"datePhoto\""));
        assert!(json.contains("\"aspectRatio\""));
    }
}
