// # Matcher Module
//
// - **DecisionGate**: single-slot rendezvous for disambiguation prompts
// - **MatchService**: the one background worker running the match workflow
//
// Public API:
// - `MatchService::start`: spawn the worker, get a `MatchHandle` plus the event stream
// - `MatchJob`: registry snapshot the worker operates on
// - `WorkflowEvent`: worker → UI updates, including `SelectionPrompt`

mod decision;
mod service;
mod types;

pub use decision::{Decision, DecisionGate, DecisionResponder, Suspension};
pub use service::{MatchError, MatchHandle, MatchService};
pub use types::{JobOutcome, MatchJob, MatchRequest, SelectionPrompt, WorkflowEvent};
