//! Conflict resolution over the decision channel.
//!
//! The resolver owns the pipeline side of the decision protocol: it emits a
//! [`DecisionRequest`] to the external collaborator and blocks on the
//! response channel, bounded by a liveness timeout so an absent collaborator
//! can never wedge a run. The pipeline invokes it at most once per run.

use crate::models::{Decision, DecisionRequest, DecisionResponse};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

/// Default liveness timeout for an unanswered decision request.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Pipeline-side endpoint of the decision channel.
pub struct ConflictResolver {
    requests: Sender<DecisionRequest>,
    responses: Mutex<Receiver<DecisionResponse>>,
    timeout: Duration,
}

impl ConflictResolver {
    /// Creates a resolver over a request sender and a response receiver.
    #[must_use]
    pub fn new(requests: Sender<DecisionRequest>, responses: Receiver<DecisionResponse>) -> Self {
        Self {
            requests,
            responses: Mutex::new(responses),
            timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }

    /// Overrides the liveness timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Emits the request and waits for a decision.
    ///
    /// A timeout, a hung-up collaborator, or a poisoned receiver all
    /// resolve to [`Decision::All`]: the liveness rule weakens nothing the
    /// collaborator actually decided, it only prevents indefinite blocking.
    #[must_use]
    pub fn resolve(&self, request: DecisionRequest) -> Decision {
        let conflicts = request.conflicts.len();

        if self.requests.send(request).is_err() {
            tracing::warn!("decision collaborator hung up before the request; applying all");
            return Decision::All;
        }

        let Ok(responses) = self.responses.lock() else {
            tracing::warn!("decision receiver poisoned; applying all");
            return Decision::All;
        };

        match responses.recv_timeout(self.timeout) {
            Ok(response) => {
                let decision = Decision::from_response(response);
                tracing::info!(action = decision.action(), conflicts, "decision received");
                decision
            },
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "decision request timed out; applying all"
                );
                Decision::All
            },
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("decision collaborator hung up without answering; applying all");
                Decision::All
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonId;
    use std::sync::mpsc;

    fn request() -> DecisionRequest {
        DecisionRequest {
            conflicts: vec![PersonId::new("100")],
            to_add: vec![],
            to_update: vec![PersonId::new("100")],
        }
    }

    #[test]
    fn test_resolve_returns_collaborator_answer() {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        let resolver = ConflictResolver::new(req_tx, resp_rx);

        let worker = std::thread::spawn(move || {
            let received = req_rx.recv().unwrap();
            assert_eq!(received.conflicts.len(), 1);
            resp_tx
                .send(DecisionResponse {
                    action: "new".to_string(),
                    selected: None,
                })
                .unwrap();
        });

        assert_eq!(resolver.resolve(request()), Decision::New);
        worker.join().unwrap();
    }

    #[test]
    fn test_timeout_resolves_to_all() {
        let (req_tx, _req_rx) = mpsc::channel();
        let (_resp_tx, resp_rx) = mpsc::channel::<DecisionResponse>();
        let resolver =
            ConflictResolver::new(req_tx, resp_rx).with_timeout(Duration::from_millis(20));

        assert_eq!(resolver.resolve(request()), Decision::All);
    }

    #[test]
    fn test_hung_up_collaborator_resolves_to_all() {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel::<DecisionResponse>();
        drop(req_rx);
        drop(resp_tx);
        let resolver = ConflictResolver::new(req_tx, resp_rx);

        assert_eq!(resolver.resolve(request()), Decision::All);
    }

    #[test]
    fn test_selected_response_round_trips() {
        let (req_tx, _req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();
        resp_tx
            .send(DecisionResponse {
                action: "selected".to_string(),
                selected: Some(vec![PersonId::new("104")]),
            })
            .unwrap();
        let resolver = ConflictResolver::new(req_tx, resp_rx);

        assert_eq!(
            resolver.resolve(request()),
            Decision::Selected(vec![PersonId::new("104")])
        );
    }
}
