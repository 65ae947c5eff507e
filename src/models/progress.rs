//! Progress event types.
//!
//! Events are emitted at least once per processed file and consumed by the
//! UI layer; the payload is serialized camelCase for the bridge.

use super::PersonId;
use serde::{Deserialize, Serialize};

/// A keyed, renderable message attached to a progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressMessage {
    /// Stable message key for the UI layer's translation table.
    pub key: String,
    /// Pre-rendered fallback text.
    pub text: String,
    /// Structured metadata for the key's placeholders.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl ProgressMessage {
    /// Creates a message with no metadata.
    #[must_use]
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            meta: serde_json::Value::Null,
        }
    }

    /// Attaches structured metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// A normalized progress event.
///
/// `current`/`total` count persons, `processed_files`/`total_files` count
/// relevant files across the whole run, and `percent` is derived from bytes
/// so large photos advance the bar proportionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 1-indexed position of the person being processed.
    pub current: usize,
    /// Total persons in the worklist.
    pub total: usize,
    /// The person being processed, when attributable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_id: Option<PersonId>,
    /// Files processed so far across the run.
    pub processed_files: usize,
    /// Total relevant files in the run.
    pub total_files: usize,
    /// Overall completion percentage (0-100), byte-weighted.
    pub percent: f64,
    /// Photos saved for the current person, when photo work is underway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos_saved: Option<usize>,
    /// Photo total for the current person.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos_total: Option<usize>,
    /// Primary human-readable message.
    pub message: String,
    /// Additional keyed messages.
    #[serde(default)]
    pub messages: Vec<ProgressMessage>,
}

impl ProgressEvent {
    /// Creates an event carrying only a message, for stage transitions.
    #[must_use]
    pub fn stage(key: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            message: text.clone(),
            messages: vec![ProgressMessage::new(key, text)],
            ..Self::default()
        }
    }

    /// Returns the byte-weighted percentage for the given progress.
    #[must_use]
    pub fn percent_of(processed_bytes: u64, total_bytes: u64) -> f64 {
        if total_bytes == 0 {
            100.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let pct = (processed_bytes as f64 / total_bytes as f64) * 100.0;
            pct.min(100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of_zero_total_is_complete() {
        assert!((ProgressEvent::percent_of(0, 0) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_of_clamps_to_hundred() {
        assert!((ProgressEvent::percent_of(200, 100) - 100.0).abs() < f64::EPSILON);
        assert!((ProgressEvent::percent_of(50, 100) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = ProgressEvent {
            current: 1,
            total: 3,
            person_id: Some(PersonId::new("104")),
            processed_files: 2,
            total_files: 9,
            percent: 22.0,
            photos_saved: Some(1),
            photos_total: Some(4),
            message: "saving photos".to_string(),
            messages: vec![ProgressMessage::new("import.photos", "saving photos")],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"processedFiles\""));
        assert!(json.contains("\"photosSaved\""));
        assert!(json.contains("\"personId\""));
    }

    #[test]
    fn test_stage_event_has_keyed_message() {
        let event = ProgressEvent::stage("import.diffing", "computing differences");
        assert_eq!(event.messages.len(), 1);
        assert_eq!(event.messages[0].key, "import.diffing");
        assert_eq!(event.message, "computing differences");
    }
}
