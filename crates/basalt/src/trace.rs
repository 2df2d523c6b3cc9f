//! Diagnostic traces of an evaluation.
//!
//! A trace is collected through a [`TraceSink`] handed to a single
//! evaluation call. The engine itself never stores trace state.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, Status};
use crate::target::MatchResult;

/// The kind of policy tree node a trace event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    PolicySet,
    Policy,
    Rule,
}

/// One step of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A node's target was evaluated.
    Target {
        node: NodeKind,
        id: String,
        result: MatchResult,
    },
    /// A rule's condition was evaluated. `None` means Indeterminate.
    Condition {
        rule: String,
        result: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<Status>,
    },
    /// A node reached its decision.
    Decision {
        node: NodeKind,
        id: String,
        decision: Decision,
    },
}

/// Receives trace events during one evaluation.
pub trait TraceSink {
    fn record(&self, event: TraceEvent);
}

/// A sink that keeps every event in order.
#[derive(Debug, Default)]
pub struct TraceBuffer {
    events: RefCell<Vec<TraceEvent>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events.into_inner()
    }
}

impl TraceSink for TraceBuffer {
    fn record(&self, event: TraceEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl<F> TraceSink for F
where
    F: Fn(TraceEvent),
{
    fn record(&self, event: TraceEvent) {
        self(event);
    }
}
