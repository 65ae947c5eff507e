//! Import report types.
//!
//! The report is a durable, loggable artifact: the UI layer renders its
//! per-person error list without the host process ever seeing a panic.

use super::PersonId;
use serde::{Deserialize, Serialize};

/// Outcome status for a single person in an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonStatus {
    /// The person was extracted and merged successfully.
    Ok,
    /// Processing failed; details are in the outcome record.
    Error,
}

/// Per-person record in the import report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonOutcome {
    /// The person this outcome describes.
    pub person_id: PersonId,
    /// Final status.
    pub status: PersonStatus,
    /// Human-readable notes accumulated while processing (tolerated
    /// per-file problems land here, not in `error`).
    #[serde(default)]
    pub details: Vec<String>,
    /// The failure that marked this person `error`, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersonOutcome {
    /// Creates a fresh outcome in the `Ok` state.
    #[must_use]
    pub fn ok(person_id: PersonId) -> Self {
        Self {
            person_id,
            status: PersonStatus::Ok,
            details: Vec::new(),
            error: None,
        }
    }

    /// Appends a detail note.
    pub fn note(&mut self, detail: impl Into<String>) {
        self.details.push(detail.into());
    }

    /// Marks the outcome as failed. The first failure wins; later calls
    /// only append to `details`.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        if self.status == PersonStatus::Ok {
            self.status = PersonStatus::Error;
            self.error = Some(error);
        } else {
            self.details.push(error);
        }
    }
}

/// A run-level error entry, pairing a person with the failure message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonError {
    /// The person that failed.
    pub person_id: PersonId,
    /// The failure message.
    pub error: String,
}

/// Result of an import run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Number of persons in the finalized worklist.
    pub total_persons: usize,
    /// Persons processed without error.
    pub success: usize,
    /// Persons recorded with status `error`.
    pub failed: usize,
    /// Flat error list, one entry per failed person.
    #[serde(default)]
    pub errors: Vec<PersonError>,
    /// Detailed per-person outcomes in worklist order.
    #[serde(default)]
    pub per_person: Vec<PersonOutcome>,
    /// Whether the run was aborted by a `cancel` decision before any write.
    #[serde(default)]
    pub cancelled: bool,
}

impl ImportReport {
    /// Creates the report for a cancelled run: zero mutation occurred.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    /// Records one person's outcome, updating the counters.
    pub fn record(&mut self, outcome: PersonOutcome) {
        match outcome.status {
            PersonStatus::Ok => self.success += 1,
            PersonStatus::Error => {
                self.failed += 1;
                self.errors.push(PersonError {
                    person_id: outcome.person_id.clone(),
                    error: outcome
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            },
        }
        self.per_person.push(outcome);
    }

    /// Whether the run completed. Per-person failures do not make a run
    /// unsuccessful; only cancellation does.
    #[must_use]
    pub const fn ok(&self) -> bool {
        !self.cancelled
    }

    /// Returns a human-readable summary line.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.cancelled {
            "Import cancelled, store untouched".to_string()
        } else {
            format!(
                "Imported {} of {} persons ({} failed)",
                self.success, self.total_persons, self.failed
            )
        }
    }
}
