//! Responses returned to the host.

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, Obligation, Outcome, Status};
use crate::trace::TraceEvent;

/// The result of one evaluation: the decision, the status explaining it,
/// the obligations for the decision and, in verbose mode, the trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub decision: Decision,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEvent>>,
}

impl Response {
    pub fn new(outcome: Outcome, trace: Option<Vec<TraceEvent>>) -> Self {
        Self {
            decision: outcome.decision,
            status: outcome.status,
            obligations: outcome.obligations,
            trace,
        }
    }

    pub fn is_permit(&self) -> bool {
        self.decision == Decision::Permit
    }

    /// Serializes the response as JSON for a host writer.
    ///
    /// # Errors
    ///
    /// Only if serialization itself fails, which the model types do not
    /// cause.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a response previously produced by [`Response::to_json`].
    ///
    /// # Errors
    ///
    /// Malformed JSON or values that fail data type validation.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
