//! Policies, policy sets and the policy store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combining::{CombiningAlgorithm, CombiningScope, combine};
use crate::context::EvaluationContext;
use crate::decision::{Obligation, Outcome};
use crate::error::{EvalError, Result};
use crate::expression::VariableDefinition;
use crate::functions::FunctionRegistry;
use crate::rule::Rule;
use crate::target::{MatchResult, Target};
use crate::trace::{NodeKind, TraceEvent};

// ============================================================================
// Policy
// ============================================================================

/// A target, variable definitions and rules combined by a rule-combining
/// algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDefinition>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Rule-combining algorithm identifier, resolved at evaluation.
    pub rule_combining: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
}

impl Policy {
    pub fn new(id: impl Into<String>, rule_combining: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: Target::any(),
            variables: Vec::new(),
            rules: Vec::new(),
            rule_combining: rule_combining.into(),
            obligations: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_variable(mut self, variable: VariableDefinition) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Evaluates the policy: target, then the rules folded by the
    /// rule-combining algorithm, then the policy's own obligations for the
    /// resulting effect.
    ///
    /// With an Indeterminate target the rules are still combined, and a
    /// Permit or Deny result becomes Indeterminate for that effect.
    ///
    /// # Errors
    ///
    /// Structural defects: an unknown or misplaced combining algorithm,
    /// unknown functions, undefined variables and excessive nesting.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Outcome> {
        let algorithm = CombiningAlgorithm::from_id(&self.rule_combining, CombiningScope::Rule)?;
        let ctx = ctx.descend()?.with_variables(&self.variables);

        let target = self.target.evaluate(&ctx)?;
        ctx.trace(|| TraceEvent::Target {
            node: NodeKind::Policy,
            id: self.id.clone(),
            result: target.clone(),
        });

        let outcome = match target {
            MatchResult::NoMatch => Outcome::not_applicable(),
            MatchResult::Indeterminate(status) => {
                combine(algorithm, &self.rules, |rule| rule.evaluate(&ctx))?
                    .under_indeterminate_target(status)
            }
            MatchResult::Match => {
                let mut outcome = combine(algorithm, &self.rules, |rule| rule.evaluate(&ctx))?;
                outcome.attach_obligations(&self.obligations);
                outcome
            }
        };

        debug!(
            policy = %self.id,
            algorithm = %algorithm,
            decision = %outcome.decision,
            "policy evaluated"
        );
        ctx.trace(|| TraceEvent::Decision {
            node: NodeKind::Policy,
            id: self.id.clone(),
            decision: outcome.decision,
        });
        Ok(outcome)
    }

    fn validate(&self, registry: &FunctionRegistry) -> Result<()> {
        CombiningAlgorithm::from_id(&self.rule_combining, CombiningScope::Rule)?;
        self.target.validate(registry)?;
        for variable in &self.variables {
            variable.expression.validate(registry, &self.variables)?;
        }
        self.rules
            .iter()
            .try_for_each(|rule| rule.validate(registry, &self.variables))
    }
}

// ============================================================================
// PolicySet
// ============================================================================

/// A target and child policies, policy sets or references combined by a
/// policy-combining algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    pub id: String,
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub children: Vec<PolicyNode>,
    /// Policy-combining algorithm identifier, resolved at evaluation.
    pub policy_combining: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
}

impl PolicySet {
    pub fn new(id: impl Into<String>, policy_combining: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            target: Target::any(),
            children: Vec::new(),
            policy_combining: policy_combining.into(),
            obligations: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_child(mut self, child: impl Into<PolicyNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Adds a reference to a policy or policy set held by the store.
    pub fn with_reference(mut self, id: impl Into<String>) -> Self {
        self.children.push(PolicyNode::Reference(id.into()));
        self
    }

    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Evaluates the policy set the way [`Policy::evaluate`] evaluates a
    /// policy, combining children with the policy-combining algorithm.
    ///
    /// # Errors
    ///
    /// As for [`Policy::evaluate`], plus unresolvable references.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Outcome> {
        let algorithm =
            CombiningAlgorithm::from_id(&self.policy_combining, CombiningScope::Policy)?;
        let ctx = ctx.descend()?.with_variables(&[]);

        let target = self.target.evaluate(&ctx)?;
        ctx.trace(|| TraceEvent::Target {
            node: NodeKind::PolicySet,
            id: self.id.clone(),
            result: target.clone(),
        });

        let outcome = match target {
            MatchResult::NoMatch => Outcome::not_applicable(),
            MatchResult::Indeterminate(status) => {
                combine(algorithm, &self.children, |child| child.evaluate(&ctx))?
                    .under_indeterminate_target(status)
            }
            MatchResult::Match => {
                let mut outcome =
                    combine(algorithm, &self.children, |child| child.evaluate(&ctx))?;
                outcome.attach_obligations(&self.obligations);
                outcome
            }
        };

        debug!(
            policy_set = %self.id,
            algorithm = %algorithm,
            decision = %outcome.decision,
            "policy set evaluated"
        );
        ctx.trace(|| TraceEvent::Decision {
            node: NodeKind::PolicySet,
            id: self.id.clone(),
            decision: outcome.decision,
        });
        Ok(outcome)
    }

    fn validate(&self, registry: &FunctionRegistry, store: &PolicyStore) -> Result<()> {
        CombiningAlgorithm::from_id(&self.policy_combining, CombiningScope::Policy)?;
        self.target.validate(registry)?;
        self.children
            .iter()
            .try_for_each(|child| child.validate(registry, store))
    }
}

// ============================================================================
// PolicyNode
// ============================================================================

/// A node of the policy tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyNode {
    Policy(Policy),
    PolicySet(PolicySet),
    /// A policy or policy set looked up in the [`PolicyStore`] by id.
    Reference(String),
}

impl PolicyNode {
    /// The node's id; for a reference, the referenced id.
    pub fn id(&self) -> &str {
        match self {
            Self::Policy(policy) => &policy.id,
            Self::PolicySet(set) => &set.id,
            Self::Reference(id) => id,
        }
    }

    /// Evaluates the node against the request in `ctx`.
    ///
    /// # Errors
    ///
    /// Structural defects of the subtree, see [`Policy::evaluate`] and
    /// [`PolicySet::evaluate`].
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Outcome> {
        match self {
            Self::Policy(policy) => policy.evaluate(ctx),
            Self::PolicySet(set) => set.evaluate(ctx),
            Self::Reference(id) => {
                let node = ctx
                    .store()
                    .get(id)
                    .ok_or_else(|| EvalError::UnresolvedReference(id.clone()))?;
                debug!(reference = %id, "following policy reference");
                node.evaluate(&ctx.descend()?)
            }
        }
    }

    /// Checks every combining algorithm id, function id, arity and
    /// variable reference of the subtree, and that references resolve.
    ///
    /// Referenced nodes are not descended into; validate the store's nodes
    /// separately.
    ///
    /// # Errors
    ///
    /// The first structural defect found.
    pub fn validate(&self, registry: &FunctionRegistry, store: &PolicyStore) -> Result<()> {
        match self {
            Self::Policy(policy) => policy.validate(registry),
            Self::PolicySet(set) => set.validate(registry, store),
            Self::Reference(id) => {
                if store.contains(id) {
                    Ok(())
                } else {
                    Err(EvalError::UnresolvedReference(id.clone()))
                }
            }
        }
    }
}

impl From<Policy> for PolicyNode {
    fn from(policy: Policy) -> Self {
        Self::Policy(policy)
    }
}

impl From<PolicySet> for PolicyNode {
    fn from(set: PolicySet) -> Self {
        Self::PolicySet(set)
    }
}

// ============================================================================
// PolicyStore
// ============================================================================

/// Policies and policy sets available to references, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyStore {
    nodes: HashMap<String, PolicyNode>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under its id, returning the node it replaced.
    pub fn insert(&mut self, node: impl Into<PolicyNode>) -> Option<PolicyNode> {
        let node = node.into();
        self.nodes.insert(node.id().to_string(), node)
    }

    pub fn with(mut self, node: impl Into<PolicyNode>) -> Self {
        self.insert(node);
        self
    }

    pub fn get(&self, id: &str) -> Option<&PolicyNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validates every stored node, see [`PolicyNode::validate`].
    ///
    /// # Errors
    ///
    /// The first structural defect found.
    pub fn validate(&self, registry: &FunctionRegistry) -> Result<()> {
        self.nodes
            .values()
            .try_for_each(|node| node.validate(registry, self))
    }
}

// ============================================================================
// Tests
// ============================================================================
