// # Decision Gate
//
// Single-slot rendezvous between the match worker and the UI. The worker
// opens a suspension (one system-wide, enforced by the gate's mutex), posts a
// prompt carrying a `DecisionResponder`, and waits on the responder's oneshot
// with a timeout. The UI answers exactly once by consuming the responder;
// dropping it unanswered counts as cancel.

use crate::discogs::SearchResult;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, MutexGuard};
use tracing::warn;

/// The user's answer to a disambiguation prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Choose(SearchResult),
    /// Search again with an edited query and prompt again
    Requery(String),
    Cancel,
}

/// Answer slot handed to the UI with each prompt
#[derive(Debug)]
pub struct DecisionResponder {
    tx: oneshot::Sender<Decision>,
}

impl DecisionResponder {
    pub fn choose(self, candidate: SearchResult) {
        self.answer(Decision::Choose(candidate));
    }

    pub fn requery(self, query: impl Into<String>) {
        self.answer(Decision::Requery(query.into()));
    }

    pub fn cancel(self) {
        self.answer(Decision::Cancel);
    }

    /// True once the worker has stopped waiting (timed out)
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn answer(self, decision: Decision) {
        // The worker may have timed out and stopped listening
        if self.tx.send(decision).is_err() {
            warn!("Decision arrived after the prompt was abandoned");
        }
    }
}

pub struct DecisionGate {
    active: Mutex<()>,
    timeout: Duration,
}

impl DecisionGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            active: Mutex::new(()),
            timeout,
        }
    }

    /// Wait until no other suspension is active, then open one
    pub async fn suspend(&self) -> Suspension<'_> {
        Suspension {
            _active: self.active.lock().await,
            timeout: self.timeout,
        }
    }

    /// True while a suspension is open
    pub fn is_suspended(&self) -> bool {
        self.active.try_lock().is_err()
    }
}

/// An open disambiguation. Prompts posted through it share the gate's single slot.
pub struct Suspension<'a> {
    _active: MutexGuard<'a, ()>,
    timeout: Duration,
}

impl Suspension<'_> {
    /// Post one prompt and wait for its answer.
    ///
    /// `post` delivers the responder to the UI and returns false if it could
    /// not; that, a dropped responder, and a timeout all resolve to `Cancel`.
    pub async fn ask<F>(&mut self, post: F) -> Decision
    where
        F: FnOnce(DecisionResponder) -> bool,
    {
        let (tx, rx) = oneshot::channel();
        if !post(DecisionResponder { tx }) {
            return Decision::Cancel;
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(decision)) => decision,
            Ok(Err(_)) => Decision::Cancel,
            Err(_) => {
                warn!(
                    "No decision within {:?}, treating prompt as cancelled",
                    self.timeout
                );
                Decision::Cancel
            }
        }
    }
}
