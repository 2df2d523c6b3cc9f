//! Decisions, effects, status codes and obligations.

use std::fmt;

use basalt_types::AttributeValue;
use serde::{Deserialize, Serialize};

// ============================================================================
// Effect
// ============================================================================

/// The effect of a rule, and the decision an obligation is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    /// The Indeterminate flavour of a node whose effect could not be
    /// confirmed.
    pub fn indeterminate(self) -> Decision {
        match self {
            Self::Permit => Decision::Indeterminate(IndeterminateKind::Permit),
            Self::Deny => Decision::Indeterminate(IndeterminateKind::Deny),
        }
    }
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Permit => Self::Permit,
            Effect::Deny => Self::Deny,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permit => f.write_str("Permit"),
            Self::Deny => f.write_str("Deny"),
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Which decision an Indeterminate result could have become.
///
/// Override algorithms use this to decide whether an error may hide a
/// decisive child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndeterminateKind {
    /// Indeterminate{P}: could only have been Permit.
    #[serde(rename = "P")]
    Permit,
    /// Indeterminate{D}: could only have been Deny.
    #[serde(rename = "D")]
    Deny,
    /// Indeterminate{DP}: could have been either.
    #[serde(rename = "DP")]
    DenyPermit,
}

/// An authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate(IndeterminateKind),
}

impl Decision {
    pub fn is_indeterminate(self) -> bool {
        matches!(self, Self::Indeterminate(_))
    }

    /// The effect this decision carries, if it is Permit or Deny.
    pub fn effect(self) -> Option<Effect> {
        match self {
            Self::Permit => Some(Effect::Permit),
            Self::Deny => Some(Effect::Deny),
            Self::NotApplicable | Self::Indeterminate(_) => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permit => f.write_str("Permit"),
            Self::Deny => f.write_str("Deny"),
            Self::NotApplicable => f.write_str("NotApplicable"),
            Self::Indeterminate(IndeterminateKind::Permit) => f.write_str("Indeterminate{P}"),
            Self::Indeterminate(IndeterminateKind::Deny) => f.write_str("Indeterminate{D}"),
            Self::Indeterminate(IndeterminateKind::DenyPermit) => f.write_str("Indeterminate{DP}"),
        }
    }
}

// ============================================================================
// Status
// ============================================================================

/// XACML status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    MissingAttribute,
    SyntaxError,
    ProcessingError,
}

impl StatusCode {
    pub fn uri(self) -> &'static str {
        match self {
            Self::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            Self::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            Self::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            Self::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        }
    }
}

/// The status reported alongside a decision, explaining Indeterminate
/// results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
        }
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::ProcessingError, message)
    }

    pub fn missing_attribute(message: impl Into<String>) -> Self {
        Self::new(StatusCode::MissingAttribute, message)
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.code.uri()),
            None => f.write_str(self.code.uri()),
        }
    }
}

// ============================================================================
// Obligations
// ============================================================================

/// A value handed to the enforcement point with an obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssignment {
    pub attribute_id: String,
    pub value: AttributeValue,
}

/// An action directive attached to a decision. The engine collects
/// obligations and passes them through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub fulfill_on: Effect,
    #[serde(default)]
    pub assignments: Vec<AttributeAssignment>,
}

impl Obligation {
    pub fn new(id: impl Into<String>, fulfill_on: Effect) -> Self {
        Self {
            id: id.into(),
            fulfill_on,
            assignments: Vec::new(),
        }
    }

    pub fn with_assignment(mut self, attribute_id: impl Into<String>, value: AttributeValue) -> Self {
        self.assignments.push(AttributeAssignment {
            attribute_id: attribute_id.into(),
            value,
        });
        self
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// The result of evaluating one rule, policy or policy set.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub decision: Decision,
    pub status: Status,
    pub obligations: Vec<Obligation>,
}

impl Outcome {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            status: Status::ok(),
            obligations: Vec::new(),
        }
    }

    pub fn not_applicable() -> Self {
        Self::new(Decision::NotApplicable)
    }

    pub fn indeterminate(kind: IndeterminateKind, status: Status) -> Self {
        Self {
            decision: Decision::Indeterminate(kind),
            status,
            obligations: Vec::new(),
        }
    }

    /// Qualifies the combined outcome of a node whose target was
    /// Indeterminate: Permit and Deny become Indeterminate for that effect
    /// with the target's `status`, NotApplicable and Indeterminate pass
    /// through. No obligations survive.
    pub(crate) fn under_indeterminate_target(self, status: Status) -> Self {
        match self.decision {
            Decision::Permit => Self::indeterminate(IndeterminateKind::Permit, status),
            Decision::Deny => Self::indeterminate(IndeterminateKind::Deny, status),
            Decision::NotApplicable => Self::not_applicable(),
            Decision::Indeterminate(kind) => Self::indeterminate(kind, self.status),
        }
    }

    /// Appends the obligations among `candidates` that apply to this
    /// outcome's decision.
    pub(crate) fn attach_obligations(&mut self, candidates: &[Obligation]) {
        if let Some(effect) = self.decision.effect() {
            self.obligations.extend(
                candidates
                    .iter()
                    .filter(|o| o.fulfill_on == effect)
                    .cloned(),
            );
        }
    }
}

impl From<Decision> for Outcome {
    fn from(decision: Decision) -> Self {
        Self::new(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indeterminate_target_keeps_the_children_effect() {
        let target = Status::new(StatusCode::MissingAttribute, "role");
        let permit = Outcome {
            obligations: vec![Obligation::new("log-access", Effect::Permit)],
            ..Outcome::new(Decision::Permit)
        };

        let qualified = permit.under_indeterminate_target(target.clone());
        assert_eq!(qualified.decision, Decision::Indeterminate(IndeterminateKind::Permit));
        assert_eq!(qualified.status, target);
        assert!(qualified.obligations.is_empty());

        assert_eq!(
            Outcome::new(Decision::Deny)
                .under_indeterminate_target(target.clone())
                .decision,
            Decision::Indeterminate(IndeterminateKind::Deny)
        );
        assert_eq!(
            Outcome::not_applicable()
                .under_indeterminate_target(target.clone())
                .decision,
            Decision::NotApplicable
        );
        let child = Status::new(StatusCode::ProcessingError, "child");
        let indeterminate = Outcome::indeterminate(IndeterminateKind::DenyPermit, child.clone())
            .under_indeterminate_target(target);
        assert_eq!(indeterminate.decision, Decision::Indeterminate(IndeterminateKind::DenyPermit));
        assert_eq!(indeterminate.status, child);
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Permit.to_string(), "Permit");
        assert_eq!(
            Decision::Indeterminate(IndeterminateKind::DenyPermit).to_string(),
            "Indeterminate{DP}"
        );
        assert_eq!(Effect::Deny.indeterminate().to_string(), "Indeterminate{D}");
    }

    #[test]
    fn test_obligations_follow_the_decision() {
        let obligations = vec![
            Obligation::new("log-access", Effect::Permit),
            Obligation::new("notify-owner", Effect::Deny),
        ];

        let mut permit = Outcome::new(Decision::Permit);
        permit.attach_obligations(&obligations);
        assert_eq!(permit.obligations.len(), 1);
        assert_eq!(permit.obligations[0].id, "log-access");

        let mut undecided = Outcome::new(Decision::NotApplicable);
        undecided.attach_obligations(&obligations);
        assert!(undecided.obligations.is_empty());
    }

    #[test]
    fn test_status_serialization() {
        let status = Status::missing_attribute("subject-id");
        let json = serde_json::to_string(&status).expect("serialize");
        assert_eq!(json, r#"{"code":"missing_attribute","message":"subject-id"}"#);
        assert_eq!(
            serde_json::to_string(&Decision::Indeterminate(IndeterminateKind::Deny))
                .expect("serialize"),
            r#"{"Indeterminate":"D"}"#
        );
    }
}
