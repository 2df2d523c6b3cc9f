//! Rules.

use basalt_types::AttributeValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::EvaluationContext;
use crate::decision::{Effect, Outcome, Status};
use crate::error::Result;
use crate::expression::{Expression, VariableDefinition};
use crate::functions::FunctionRegistry;
use crate::target::{MatchResult, Target};
use crate::trace::{NodeKind, TraceEvent};
use crate::value::EvaluationValue;

/// A rule: a target, an optional boolean condition and the effect it
/// produces when both hold. Rules keep no state between evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub effect: Effect,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
}

impl Rule {
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            effect,
            target: Target::any(),
            condition: None,
        }
    }

    pub fn permit(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Permit)
    }

    pub fn deny(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Deny)
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Evaluates the rule.
    ///
    /// - target NoMatch: NotApplicable
    /// - target Indeterminate: Indeterminate qualified by the effect
    /// - condition true (or absent): the effect
    /// - condition false: NotApplicable
    /// - condition Indeterminate or not boolean: Indeterminate qualified by
    ///   the effect
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Outcome> {
        let target = self.target.evaluate(ctx)?;
        ctx.trace(|| TraceEvent::Target {
            node: NodeKind::Rule,
            id: self.id.clone(),
            result: target.clone(),
        });

        let outcome = match target {
            MatchResult::NoMatch => Outcome::not_applicable(),
            MatchResult::Indeterminate(status) => self.indeterminate(status),
            MatchResult::Match => self.evaluate_condition(ctx)?,
        };

        debug!(rule = %self.id, decision = %outcome.decision, "rule evaluated");
        ctx.trace(|| TraceEvent::Decision {
            node: NodeKind::Rule,
            id: self.id.clone(),
            decision: outcome.decision,
        });
        Ok(outcome)
    }

    fn evaluate_condition(&self, ctx: &EvaluationContext<'_>) -> Result<Outcome> {
        let Some(condition) = &self.condition else {
            return Ok(Outcome::new(self.effect.into()));
        };

        let (result, status) = match condition.evaluate(ctx)? {
            EvaluationValue::Value(AttributeValue::Boolean(b)) => (Some(b), None),
            EvaluationValue::Indeterminate(status) => (None, Some(status)),
            other => (
                None,
                Some(Status::processing_error(format!(
                    "condition of rule {} produced {} instead of a boolean",
                    self.id,
                    other.describe()
                ))),
            ),
        };
        ctx.trace(|| TraceEvent::Condition {
            rule: self.id.clone(),
            result,
            status: status.clone(),
        });

        Ok(match (result, status) {
            (Some(true), _) => Outcome::new(self.effect.into()),
            (Some(false), _) => Outcome::not_applicable(),
            (None, status) => self.indeterminate(status.unwrap_or_default()),
        })
    }

    fn indeterminate(&self, status: Status) -> Outcome {
        Outcome {
            status,
            ..Outcome::new(self.effect.indeterminate())
        }
    }

    pub(crate) fn validate(
        &self,
        registry: &FunctionRegistry,
        variables: &[VariableDefinition],
    ) -> Result<()> {
        self.target.validate(registry)?;
        if let Some(condition) = &self.condition {
            condition.validate(registry, variables)?;
        }
        Ok(())
    }
}
