//! Manifest validation and decoding.
//!
//! Archive person records arrive as loosely-typed JSON. They are decoded
//! ONCE here into [`ArchivedPerson`] values — per-field presence preserved —
//! and every problem is recorded as a [`ValidationIssue`] instead of
//! surfacing later as a scattered field-presence check. Invalid entries are
//! skipped with a warning; they never abort a run.

use crate::models::{Person, PersonId, PhotoMeta};
use crate::store::is_safe_id;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Issue noted; the record is still usable.
    Warning,
    /// The record was skipped.
    Error,
}

/// A validation issue found while decoding a manifest.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// The manifest location with the issue, e.g. `people[3]`.
    pub field: String,
    /// Description of the issue.
    pub message: String,
    /// Severity of the issue.
    pub severity: ValidationSeverity,
}

impl ValidationIssue {
    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }

    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }
}

/// An archive person record with per-field presence.
///
/// `None` means the field was absent from the manifest entry, which the
/// merge preserves; `Some` — including `Some` of an empty list — overwrites.
/// This is what lets a snapshot clear a photo list without also wiping
/// fields it never mentioned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedPerson {
    /// Unique identifier (required).
    pub id: PersonId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Father back-reference.
    #[serde(default)]
    pub father: Option<PersonId>,
    /// Mother back-reference.
    #[serde(default)]
    pub mother: Option<PersonId>,
    /// Child ids.
    #[serde(default)]
    pub children: Option<Vec<PersonId>>,
    /// Sibling ids.
    #[serde(default)]
    pub siblings: Option<Vec<PersonId>>,
    /// Spouse ids.
    #[serde(default)]
    pub spouse: Option<Vec<PersonId>>,
    /// Biography text.
    #[serde(default)]
    pub bio: Option<String>,
    /// Photo metadata list.
    #[serde(default)]
    pub photos: Option<Vec<PhotoMeta>>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last edit timestamp.
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

impl ArchivedPerson {
    /// Creates a bare record carrying only an id.
    ///
    /// Used when the worklist had to be derived from the archive file
    /// listing because the manifest was missing.
    #[must_use]
    pub fn bare(id: PersonId) -> Self {
        Self {
            id,
            name: None,
            father: None,
            mother: None,
            children: None,
            siblings: None,
            spouse: None,
            bio: None,
            photos: None,
            created_at: None,
            edited_at: None,
        }
    }

    /// Returns the photo filename set, if photos were present.
    #[must_use]
    pub fn photo_filenames(&self) -> Option<BTreeSet<&str>> {
        self.photos
            .as_ref()
            .map(|photos| photos.iter().map(|p| p.filename.as_str()).collect())
    }

    /// Whether this record's bio differs from the stored one.
    ///
    /// An absent bio never differs; the merge would preserve the stored
    /// text, so classifying it as a change would be noise.
    #[must_use]
    pub fn bio_differs(&self, existing: &Person) -> bool {
        self.bio.as_ref().is_some_and(|bio| *bio != existing.bio)
    }

    /// Whether this record's photo filename set differs from the stored
    /// one (symmetric difference non-empty, order-independent).
    #[must_use]
    pub fn photo_set_differs(&self, existing: &Person) -> bool {
        self.photo_filenames()
            .is_some_and(|incoming| incoming != existing.photo_filenames())
    }

    /// Merges this record into an existing one: present fields overwrite,
    /// absent fields are preserved.
    pub fn merge_into(&self, existing: &mut Person) {
        if let Some(name) = &self.name {
            existing.name.clone_from(name);
        }
        if let Some(father) = &self.father {
            existing.father = Some(father.clone());
        }
        if let Some(mother) = &self.mother {
            existing.mother = Some(mother.clone());
        }
        if let Some(children) = &self.children {
            existing.children.clone_from(children);
        }
        if let Some(siblings) = &self.siblings {
            existing.siblings.clone_from(siblings);
        }
        if let Some(spouse) = &self.spouse {
            existing.spouse.clone_from(spouse);
        }
        if let Some(bio) = &self.bio {
            existing.bio.clone_from(bio);
        }
        if let Some(photos) = &self.photos {
            existing.photos.clone_from(photos);
        }
        if let Some(created_at) = self.created_at {
            existing.created_at = created_at;
        }
        if let Some(edited_at) = self.edited_at {
            existing.edited_at = edited_at;
        }
    }

    /// Converts into a full person record, applying defaults for absent
    /// fields. Used for records classified as New.
    #[must_use]
    pub fn into_person(self) -> Person {
        let mut person = Person::new(self.id.clone());
        self.merge_into(&mut person);
        person
    }
}

/// Result of decoding a manifest.
#[derive(Debug)]
pub struct ManifestDecode {
    /// Usable person records, manifest order preserved.
    pub people: Vec<ArchivedPerson>,
    /// Problems found while decoding.
    pub issues: Vec<ValidationIssue>,
}

/// Decodes and validates archive manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator;

impl ManifestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decodes a manifest JSON document.
    ///
    /// Entry-level problems (missing id, unsafe id, undecodable record,
    /// duplicate id) become issues and the entry is skipped; manifest-level
    /// problems (not JSON, no `people` array) are errors the caller may
    /// answer with the file-listing fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not JSON or has no `people`
    /// array.
    pub fn decode(&self, json: &str) -> Result<ManifestDecode> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::op("parse_manifest", e))?;

        let Some(entries) = value.get("people").and_then(|p| p.as_array()) else {
            return Err(Error::op("parse_manifest", "no 'people' array"));
        };

        let mut people = Vec::with_capacity(entries.len());
        let mut issues = Vec::new();
        let mut seen: HashSet<PersonId> = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let field = format!("people[{index}]");

            let Some(id) = entry.get("id").and_then(|id| id.as_str()) else {
                issues.push(ValidationIssue::error(&field, "missing string 'id'"));
                continue;
            };
            if !is_safe_id(id) {
                issues.push(ValidationIssue::error(
                    &field,
                    format!("id contains invalid characters: '{id}'"),
                ));
                continue;
            }

            let person: ArchivedPerson = match serde_json::from_value(entry.clone()) {
                Ok(person) => person,
                Err(e) => {
                    issues.push(ValidationIssue::error(&field, format!("undecodable: {e}")));
                    continue;
                },
            };

            if !seen.insert(person.id.clone()) {
                issues.push(ValidationIssue::warning(
                    &field,
                    format!("duplicate id '{id}', keeping the first occurrence"),
                ));
                continue;
            }

            people.push(person);
        }

        Ok(ManifestDecode { people, issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> ManifestDecode {
        ManifestValidator::new().decode(json).unwrap()
    }

    #[test]
    fn test_decode_valid_manifest() {
        let decoded = decode(
            r#"{"people":[
                {"id":"104","name":"Ada","bio":"Born 1901."},
                {"id":"207"}
            ]}"#,
        );
        assert_eq!(decoded.people.len(), 2);
        assert!(decoded.issues.is_empty());
        assert_eq!(decoded.people[0].name.as_deref(), Some("Ada"));
        assert!(decoded.people[1].bio.is_none());
    }

    #[test]
    fn test_decode_skips_bad_entries() {
        let decoded = decode(
            r#"{"people":[
                {"name":"no id"},
                {"id":"../evil"},
                {"id":"104","photos":"not a list"},
                {"id":"207"}
            ]}"#,
        );
        assert_eq!(decoded.people.len(), 1);
        assert_eq!(decoded.people[0].id.as_str(), "207");
        assert_eq!(decoded.issues.len(), 3);
        assert!(decoded
            .issues
            .iter()
            .all(|i| i.severity == ValidationSeverity::Error));
    }

    #[test]
    fn test_decode_keeps_first_duplicate() {
        let decoded = decode(
            r#"{"people":[
                {"id":"104","name":"First"},
                {"id":"104","name":"Second"}
            ]}"#,
        );
        assert_eq!(decoded.people.len(), 1);
        assert_eq!(decoded.people[0].name.as_deref(), Some("First"));
        assert_eq!(decoded.issues.len(), 1);
        assert_eq!(decoded.issues[0].severity, ValidationSeverity::Warning);
    }

    #[test]
    fn test_decode_rejects_non_manifest() {
        let validator = ManifestValidator::new();
        assert!(validator.decode("not json").is_err());
        assert!(validator.decode(r#"{"persons":[]}"#).is_err());
    }

    #[test]
    fn test_merge_preserves_absent_fields() {
        let mut existing = Person::new("104").with_name("Ada").with_bio("OLD");
        existing.photos.push(PhotoMeta::new("p1", "a.jpg"));

        let incoming: ArchivedPerson =
            serde_json::from_str(r#"{"id":"104","bio":"NEW"}"#).unwrap();
        incoming.merge_into(&mut existing);

        assert_eq!(existing.bio, "NEW");
        assert_eq!(existing.name, "Ada");
        assert_eq!(existing.photos.len(), 1);
    }

    #[test]
    fn test_merge_applies_present_empty_list() {
        let mut existing = Person::new("104");
        existing.photos.push(PhotoMeta::new("p1", "a.jpg"));

        let incoming: ArchivedPerson =
            serde_json::from_str(r#"{"id":"104","photos":[]}"#).unwrap();
        incoming.merge_into(&mut existing);

        assert!(existing.photos.is_empty());
    }

    #[test]
    fn test_diff_helpers_ignore_absent_fields() {
        let existing = Person::new("104").with_bio("text");
        let sparse = ArchivedPerson::bare(PersonId::new("104"));
        assert!(!sparse.bio_differs(&existing));
        assert!(!sparse.photo_set_differs(&existing));

        let incoming: ArchivedPerson =
            serde_json::from_str(r#"{"id":"104","bio":"other"}"#).unwrap();
        assert!(incoming.bio_differs(&existing));
    }

    #[test]
    fn test_photo_set_comparison_is_order_independent() {
        let mut existing = Person::new("104");
        existing.photos.push(PhotoMeta::new("p1", "a.jpg"));
        existing.photos.push(PhotoMeta::new("p2", "b.jpg"));

        let incoming: ArchivedPerson = serde_json::from_str(
            r#"{"id":"104","photos":[
                {"id":"x","filename":"b.jpg"},
                {"id":"y","filename":"a.jpg"}
            ]}"#,
        )
        .unwrap();
        assert!(!incoming.photo_set_differs(&existing));
    }
}
