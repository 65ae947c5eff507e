//! Archive-versus-store diff.
//!
//! Classifies each archive person as New, Update, or Unchanged against the
//! record store. Classification is deterministic and independent of input
//! order; only bio text and the photo filename set are compared — see
//! DESIGN.md for the relationship-field policy.

use crate::archive::ArchivedPerson;
use crate::models::{DecisionRequest, Person, PersonId};
use std::collections::HashMap;
use std::fmt;

/// Maximum ids previewed per bucket in [`DiffSummary`].
const PREVIEW_LIMIT: usize = 10;

/// Preview of one diff bucket: up to ten ids plus an overflow count.
///
/// Purely a formatting concern; classification never consults it.
#[derive(Debug, Clone, Default)]
pub struct BucketSummary {
    /// The first ids in the bucket, bucket order.
    pub preview: Vec<PersonId>,
    /// How many ids were cut from the preview.
    pub overflow: usize,
}

impl BucketSummary {
    fn of(ids: &[PersonId]) -> Self {
        Self {
            preview: ids.iter().take(PREVIEW_LIMIT).cloned().collect(),
            overflow: ids.len().saturating_sub(PREVIEW_LIMIT),
        }
    }
}

impl fmt::Display for BucketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.preview.iter().map(PersonId::as_str).collect();
        write!(f, "{}", ids.join(", "))?;
        if self.overflow > 0 {
            write!(f, " (+{} more)", self.overflow)?;
        }
        Ok(())
    }
}

/// Human-oriented preview of a diff.
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Preview of records absent from the store.
    pub added: BucketSummary,
    /// Preview of records with differing content.
    pub updated: BucketSummary,
    /// Preview of records with identical content.
    pub unchanged: BucketSummary,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "new: [{}] updated: [{}] unchanged: [{}]",
            self.added, self.updated, self.unchanged
        )
    }
}

/// Result of diffing an archive against the store.
#[derive(Debug, Clone, Default)]
pub struct DiffOutcome {
    /// Ids absent from the store, archive manifest order.
    pub to_add: Vec<PersonId>,
    /// Ids present with differing content, archive manifest order.
    pub to_update: Vec<PersonId>,
    /// Ids present with identical content, archive manifest order.
    pub unchanged: Vec<PersonId>,
    /// Formatting-only preview.
    pub summary: DiffSummary,
}

impl DiffOutcome {
    /// Whether any record needs an update decision.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.to_update.is_empty()
    }

    /// Whether the archive brings nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty()
    }

    /// Builds the request sent to the deciding collaborator.
    #[must_use]
    pub fn decision_request(&self) -> DecisionRequest {
        DecisionRequest {
            conflicts: self.to_update.clone(),
            to_add: self.to_add.clone(),
            to_update: self.to_update.clone(),
        }
    }
}

/// Classifies archive records against the store.
#[derive(Debug, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff.
    ///
    /// `archive_people` supplies the bucket order (manifest order);
    /// `store_people` is only consulted by id, so its order is irrelevant.
    #[must_use]
    pub fn compute(
        &self,
        archive_people: &[ArchivedPerson],
        store_people: &[Person],
    ) -> DiffOutcome {
        let by_id: HashMap<&PersonId, &Person> =
            store_people.iter().map(|p| (&p.id, p)).collect();

        let mut outcome = DiffOutcome::default();
        for incoming in archive_people {
            match by_id.get(&incoming.id) {
                None => outcome.to_add.push(incoming.id.clone()),
                Some(existing) => {
                    if incoming.bio_differs(existing) || incoming.photo_set_differs(existing) {
                        outcome.to_update.push(incoming.id.clone());
                    } else {
                        outcome.unchanged.push(incoming.id.clone());
                    }
                },
            }
        }

        outcome.summary = DiffSummary {
            added: BucketSummary::of(&outcome.to_add),
            updated: BucketSummary::of(&outcome.to_update),
            unchanged: BucketSummary::of(&outcome.unchanged),
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhotoMeta;

    fn archived(json: &str) -> ArchivedPerson {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_scenario_a_new_person() {
        // archive = [{100, "A"}, {200, "B"}], store = [{100, "A"}]
        let archive = vec![
            archived(r#"{"id":"100","bio":"A"}"#),
            archived(r#"{"id":"200","bio":"B"}"#),
        ];
        let store = vec![Person::new("100").with_bio("A")];

        let diff = DiffEngine::new().compute(&archive, &store);
        assert_eq!(diff.to_add, vec![PersonId::new("200")]);
        assert!(diff.to_update.is_empty());
        assert_eq!(diff.unchanged, vec![PersonId::new("100")]);
    }

    #[test]
    fn test_scenario_b_bio_conflict() {
        // store = [{100, "OLD"}], archive = [{100, "NEW"}]
        let archive = vec![archived(r#"{"id":"100","bio":"NEW"}"#)];
        let store = vec![Person::new("100").with_bio("OLD")];

        let diff = DiffEngine::new().compute(&archive, &store);
        assert!(diff.to_add.is_empty());
        assert_eq!(diff.to_update, vec![PersonId::new("100")]);
        assert!(diff.has_conflicts());
    }

    #[test]
    fn test_photo_set_difference_is_an_update() {
        let archive = vec![archived(
            r#"{"id":"100","photos":[{"id":"p","filename":"new.jpg"}]}"#,
        )];
        let mut person = Person::new("100");
        person.photos.push(PhotoMeta::new("p", "old.jpg"));

        let diff = DiffEngine::new().compute(&archive, &[person]);
        assert_eq!(diff.to_update, vec![PersonId::new("100")]);
    }

    #[test]
    fn test_relationship_only_change_is_unchanged() {
        let archive = vec![archived(r#"{"id":"100","bio":"A","father":"050"}"#)];
        let store = vec![Person::new("100").with_bio("A")];

        let diff = DiffEngine::new().compute(&archive, &store);
        assert_eq!(diff.unchanged, vec![PersonId::new("100")]);
    }

    #[test]
    fn test_store_order_does_not_matter() {
        let archive = vec![
            archived(r#"{"id":"100","bio":"A"}"#),
            archived(r#"{"id":"200","bio":"B"}"#),
            archived(r#"{"id":"300","bio":"C"}"#),
        ];
        let forward = vec![
            Person::new("100").with_bio("A"),
            Person::new("200").with_bio("other"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let engine = DiffEngine::new();
        let a = engine.compute(&archive, &forward);
        let b = engine.compute(&archive, &reversed);
        assert_eq!(a.to_add, b.to_add);
        assert_eq!(a.to_update, b.to_update);
        assert_eq!(a.unchanged, b.unchanged);
    }

    #[test]
    fn test_buckets_keep_manifest_order() {
        let archive = vec![
            archived(r#"{"id":"300","bio":"x"}"#),
            archived(r#"{"id":"100","bio":"y"}"#),
        ];
        let diff = DiffEngine::new().compute(&archive, &[]);
        assert_eq!(diff.to_add, vec![PersonId::new("300"), PersonId::new("100")]);
    }

    #[test]
    fn test_summary_previews_ten_with_overflow() {
        let archive: Vec<ArchivedPerson> = (0..14)
            .map(|i| archived(&format!(r#"{{"id":"{}","bio":"b"}}"#, 100 + i)))
            .collect();
        let diff = DiffEngine::new().compute(&archive, &[]);

        assert_eq!(diff.to_add.len(), 14);
        assert_eq!(diff.summary.added.preview.len(), 10);
        assert_eq!(diff.summary.added.overflow, 4);
        assert!(diff.summary.to_string().contains("+4 more"));
    }
}
