//! Combining algorithms.
//!
//! A combining algorithm folds the outcomes of a node's children, visited in
//! declaration order, into one outcome. Children are evaluated lazily through
//! a callback so that algorithms which stop early (first-applicable, the
//! override algorithms on their favoured decision) never evaluate the rest.
//!
//! The override algorithms follow the XACML 3.0 extended Indeterminate
//! table: an Indeterminate child only blocks a decision it could have
//! produced.

use std::fmt;

use crate::decision::{Decision, Effect, IndeterminateKind, Outcome, Status};
use crate::error::{EvalError, Result};

const XACML_PREFIX: &str = "urn:oasis:names:tc:xacml:";
const VERSIONS: [&str; 3] = ["1.0", "1.1", "3.0"];

/// Where an algorithm is applied: to the rules of a policy or to the
/// children of a policy set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombiningScope {
    Rule,
    Policy,
}

impl CombiningScope {
    fn segment(self) -> &'static str {
        match self {
            Self::Rule => "rule-combining-algorithm",
            Self::Policy => "policy-combining-algorithm",
        }
    }
}

impl fmt::Display for CombiningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule => f.write_str("rules"),
            Self::Policy => f.write_str("policies"),
        }
    }
}

/// The built-in combining algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombiningAlgorithm {
    DenyOverrides,
    PermitOverrides,
    OrderedDenyOverrides,
    OrderedPermitOverrides,
    FirstApplicable,
    /// Policy scope only.
    OnlyOneApplicable,
    DenyUnlessPermit,
    PermitUnlessDeny,
}

impl CombiningAlgorithm {
    pub const ALL: [Self; 8] = [
        Self::DenyOverrides,
        Self::PermitOverrides,
        Self::OrderedDenyOverrides,
        Self::OrderedPermitOverrides,
        Self::FirstApplicable,
        Self::OnlyOneApplicable,
        Self::DenyUnlessPermit,
        Self::PermitUnlessDeny,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::DenyOverrides => "deny-overrides",
            Self::PermitOverrides => "permit-overrides",
            Self::OrderedDenyOverrides => "ordered-deny-overrides",
            Self::OrderedPermitOverrides => "ordered-permit-overrides",
            Self::FirstApplicable => "first-applicable",
            Self::OnlyOneApplicable => "only-one-applicable",
            Self::DenyUnlessPermit => "deny-unless-permit",
            Self::PermitUnlessDeny => "permit-unless-deny",
        }
    }

    /// XACML version that introduced the algorithm.
    fn version(self) -> &'static str {
        match self {
            Self::FirstApplicable | Self::OnlyOneApplicable => "1.0",
            Self::OrderedDenyOverrides | Self::OrderedPermitOverrides => "1.1",
            Self::DenyOverrides
            | Self::PermitOverrides
            | Self::DenyUnlessPermit
            | Self::PermitUnlessDeny => "3.0",
        }
    }

    /// Whether the algorithm is defined for `scope`.
    pub fn supports(self, scope: CombiningScope) -> bool {
        !(self == Self::OnlyOneApplicable && scope == CombiningScope::Rule)
    }

    /// The canonical identifier of the algorithm in `scope`.
    pub fn id(self, scope: CombiningScope) -> String {
        format!(
            "{XACML_PREFIX}{}:{}:{}",
            self.version(),
            scope.segment(),
            self.name()
        )
    }

    /// Resolves an algorithm identifier for use in `scope`.
    ///
    /// Accepts `urn:oasis:names:tc:xacml:{1.0,1.1,3.0}:<scope>-combining-algorithm:<name>`.
    ///
    /// # Errors
    ///
    /// [`EvalError::UnknownCombiningAlgorithm`] for an unrecognised id and
    /// [`EvalError::InvalidCombiningScope`] for an id of the other scope or an
    /// algorithm the scope does not define.
    pub fn from_id(id: &str, scope: CombiningScope) -> Result<Self> {
        let unknown = || EvalError::UnknownCombiningAlgorithm(id.to_string());
        let wrong_scope = || EvalError::InvalidCombiningScope {
            algorithm: id.to_string(),
            scope,
        };

        let rest = id.strip_prefix(XACML_PREFIX).ok_or_else(unknown)?;
        let (version, rest) = rest.split_once(':').ok_or_else(unknown)?;
        if !VERSIONS.contains(&version) {
            return Err(unknown());
        }
        let (segment, name) = rest.split_once(':').ok_or_else(unknown)?;
        let algorithm = Self::ALL
            .into_iter()
            .find(|a| a.name() == name)
            .ok_or_else(unknown)?;

        let other = match scope {
            CombiningScope::Rule => CombiningScope::Policy,
            CombiningScope::Policy => CombiningScope::Rule,
        };
        if segment == other.segment() || !algorithm.supports(scope) {
            return Err(wrong_scope());
        }
        if segment != scope.segment() {
            return Err(unknown());
        }
        Ok(algorithm)
    }
}

impl fmt::Display for CombiningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Combines `children`, evaluating each on demand with `evaluate`.
///
/// The result carries the obligations of every evaluated child whose
/// decision equals the combined decision. An Indeterminate result carries
/// the status of the first Indeterminate child.
///
/// # Errors
///
/// Propagates the first structural error returned by `evaluate`.
pub fn combine<T, F>(algorithm: CombiningAlgorithm, children: &[T], mut evaluate: F) -> Result<Outcome>
where
    F: FnMut(&T) -> Result<Outcome>,
{
    let mut outcomes: Vec<Outcome> = Vec::with_capacity(children.len());
    let decision = match algorithm {
        CombiningAlgorithm::DenyOverrides | CombiningAlgorithm::OrderedDenyOverrides => {
            overrides(Effect::Deny, children, &mut evaluate, &mut outcomes)?
        }
        CombiningAlgorithm::PermitOverrides | CombiningAlgorithm::OrderedPermitOverrides => {
            overrides(Effect::Permit, children, &mut evaluate, &mut outcomes)?
        }
        CombiningAlgorithm::DenyUnlessPermit => {
            unless(Effect::Permit, children, &mut evaluate, &mut outcomes)?
        }
        CombiningAlgorithm::PermitUnlessDeny => {
            unless(Effect::Deny, children, &mut evaluate, &mut outcomes)?
        }
        CombiningAlgorithm::FirstApplicable => {
            for child in children {
                let outcome = evaluate(child)?;
                if outcome.decision != Decision::NotApplicable {
                    return Ok(outcome);
                }
            }
            return Ok(Outcome::not_applicable());
        }
        CombiningAlgorithm::OnlyOneApplicable => {
            let mut applicable: Option<Outcome> = None;
            for child in children {
                let outcome = evaluate(child)?;
                if outcome.decision == Decision::NotApplicable {
                    continue;
                }
                if applicable.is_some() {
                    return Ok(Outcome::indeterminate(
                        IndeterminateKind::DenyPermit,
                        Status::processing_error(
                            "more than one child is applicable under only-one-applicable",
                        ),
                    ));
                }
                applicable = Some(outcome);
            }
            return Ok(applicable.unwrap_or_else(Outcome::not_applicable));
        }
    };
    Ok(collect(decision, outcomes))
}

/// Combines already computed decisions.
pub fn combine_decisions(algorithm: CombiningAlgorithm, decisions: &[Decision]) -> Decision {
    // The callback never fails.
    combine(algorithm, decisions, |d| Ok(Outcome::new(*d)))
        .map_or(Decision::Indeterminate(IndeterminateKind::DenyPermit), |o| o.decision)
}

fn overrides<T, F>(
    favoured: Effect,
    children: &[T],
    evaluate: &mut F,
    outcomes: &mut Vec<Outcome>,
) -> Result<Decision>
where
    F: FnMut(&T) -> Result<Outcome>,
{
    let (favoured_kind, other_kind, other) = match favoured {
        Effect::Deny => (IndeterminateKind::Deny, IndeterminateKind::Permit, Decision::Permit),
        Effect::Permit => (IndeterminateKind::Permit, IndeterminateKind::Deny, Decision::Deny),
    };

    let mut err_favoured = false;
    let mut err_other = false;
    let mut err_both = false;
    let mut saw_other = false;

    for child in children {
        let outcome = evaluate(child)?;
        let decision = outcome.decision;
        outcomes.push(outcome);
        match decision {
            d if d == Decision::from(favoured) => return Ok(d),
            d if d == other => saw_other = true,
            Decision::Indeterminate(IndeterminateKind::DenyPermit) => err_both = true,
            Decision::Indeterminate(kind) if kind == favoured_kind => err_favoured = true,
            Decision::Indeterminate(_) => err_other = true,
            _ => {}
        }
    }

    Ok(if err_both || (err_favoured && (err_other || saw_other)) {
        Decision::Indeterminate(IndeterminateKind::DenyPermit)
    } else if err_favoured {
        Decision::Indeterminate(favoured_kind)
    } else if saw_other {
        other
    } else if err_other {
        Decision::Indeterminate(other_kind)
    } else {
        Decision::NotApplicable
    })
}

/// deny-unless-permit (`wanted` = Permit) and permit-unless-deny (`wanted` =
/// Deny): the wanted effect if any child produces it, otherwise the opposite.
fn unless<T, F>(
    wanted: Effect,
    children: &[T],
    evaluate: &mut F,
    outcomes: &mut Vec<Outcome>,
) -> Result<Decision>
where
    F: FnMut(&T) -> Result<Outcome>,
{
    let wanted = Decision::from(wanted);
    for child in children {
        let outcome = evaluate(child)?;
        let decision = outcome.decision;
        outcomes.push(outcome);
        if decision == wanted {
            return Ok(wanted);
        }
    }
    Ok(match wanted {
        Decision::Permit => Decision::Deny,
        _ => Decision::Permit,
    })
}

fn collect(decision: Decision, outcomes: Vec<Outcome>) -> Outcome {
    let mut combined = Outcome::new(decision);
    if decision.is_indeterminate() {
        if let Some(status) = outcomes
            .iter()
            .find(|o| o.decision.is_indeterminate())
            .map(|o| o.status.clone())
        {
            combined.status = status;
        }
        return combined;
    }
    combined.obligations = outcomes
        .into_iter()
        .filter(|o| o.decision == decision)
        .flat_map(|o| o.obligations)
        .collect();
    combined
}

// ============================================================================
// Tests
// ============================================================================
