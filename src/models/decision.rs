//! Conflict decision protocol types.
//!
//! When an import finds updatable records, the pipeline suspends and asks an
//! external collaborator which diff buckets to apply. These types are the
//! wire format of that exchange.

use super::PersonId;
use serde::{Deserialize, Serialize};

/// Request emitted to the deciding collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Ids with conflicting content (same as `to_update`; kept separate so
    /// the UI contract stays stable if conflict detection ever narrows).
    pub conflicts: Vec<PersonId>,
    /// Ids absent from the store.
    pub to_add: Vec<PersonId>,
    /// Ids present with differing content.
    pub to_update: Vec<PersonId>,
}

/// Raw response from the deciding collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    /// One of `all`, `new`, `selected`, `cancel`.
    pub action: String,
    /// Explicit id list, only meaningful for `selected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<Vec<PersonId>>,
}

/// A resolved decision about which diff buckets to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Apply `to_add` and `to_update`.
    All,
    /// Apply `to_add` only.
    New,
    /// Apply only the explicitly listed ids.
    Selected(Vec<PersonId>),
    /// Abort with zero mutation.
    Cancel,
}

impl Decision {
    /// Parses a wire response. Unknown actions and a `selected` action
    /// without ids fall back to [`Decision::All`], matching the liveness
    /// rule that an unusable answer must not wedge the run.
    #[must_use]
    pub fn from_response(response: DecisionResponse) -> Self {
        match response.action.as_str() {
            "new" => Self::New,
            "cancel" => Self::Cancel,
            "selected" => response
                .selected
                .map_or(Self::All, Self::Selected),
            _ => Self::All,
        }
    }

    /// Returns the wire action string.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::New => "new",
            Self::Selected(_) => "selected",
            Self::Cancel => "cancel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("all", Decision::All; "all action")]
    #[test_case("new", Decision::New; "new action")]
    #[test_case("cancel", Decision::Cancel; "cancel action")]
    #[test_case("garbage", Decision::All; "unknown falls back to all")]
    fn test_from_response_action(action: &str, expected: Decision) {
        let response = DecisionResponse {
            action: action.to_string(),
            selected: None,
        };
        assert_eq!(Decision::from_response(response), expected);
    }

    #[test]
    fn test_from_response_selected() {
        let response = DecisionResponse {
            action: "selected".to_string(),
            selected: Some(vec![PersonId::new("104")]),
        };
        assert_eq!(
            Decision::from_response(response),
            Decision::Selected(vec![PersonId::new("104")])
        );
    }

    #[test]
    fn test_selected_without_ids_falls_back_to_all() {
        let response = DecisionResponse {
            action: "selected".to_string(),
            selected: None,
        };
        assert_eq!(Decision::from_response(response), Decision::All);
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = DecisionRequest {
            conflicts: vec![PersonId::new("100")],
            to_add: vec![PersonId::new("200")],
            to_update: vec![PersonId::new("100")],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"toAdd\""));
        assert!(json.contains("\"toUpdate\""));
    }
}
