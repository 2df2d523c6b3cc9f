//! Target matching.
//!
//! A target is a list of items, each tagged with the category it tests.
//! Matches inside one item are ANDed, items of the same category are ORed,
//! and the categories are ANDed. A category without items matches
//! vacuously.

use basalt_types::{AttributeValue, DataType};
use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::decision::Status;
use crate::error::{EvalError, Result};
use crate::expression::AttributeDesignator;
use crate::functions::{FunctionRegistry, Param, invoke};
use crate::request::Category;
use crate::value::EvaluationValue;

/// The result of evaluating a match, an item or a whole target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Match,
    NoMatch,
    Indeterminate(Status),
}

impl MatchResult {
    /// AND over results: any NoMatch wins, then the first Indeterminate.
    fn all(results: impl IntoIterator<Item = Result<MatchResult>>) -> Result<MatchResult> {
        let mut indeterminate = None;
        for result in results {
            match result? {
                Self::Match => {}
                Self::NoMatch => return Ok(Self::NoMatch),
                Self::Indeterminate(status) => {
                    indeterminate.get_or_insert(status);
                }
            }
        }
        Ok(indeterminate.map_or(Self::Match, Self::Indeterminate))
    }

    /// OR over results: any Match wins, then the first Indeterminate.
    fn any(results: impl IntoIterator<Item = Result<MatchResult>>) -> Result<MatchResult> {
        let mut indeterminate = None;
        for result in results {
            match result? {
                Self::Match => return Ok(Self::Match),
                Self::NoMatch => {}
                Self::Indeterminate(status) => {
                    indeterminate.get_or_insert(status);
                }
            }
        }
        Ok(indeterminate.map_or(Self::NoMatch, Self::Indeterminate))
    }
}

// ============================================================================
// Match
// ============================================================================

/// Compares a literal against the values a designator selects:
/// `function(literal, candidate)` for each candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub function_id: String,
    pub value: AttributeValue,
    pub designator: AttributeDesignator,
}

impl Match {
    pub fn new(
        function_id: impl Into<String>,
        value: impl Into<AttributeValue>,
        designator: AttributeDesignator,
    ) -> Self {
        Self {
            function_id: function_id.into(),
            value: value.into(),
            designator,
        }
    }

    /// Match when any candidate satisfies the function. An empty bag is
    /// NoMatch; Indeterminate when no candidate matched and at least one
    /// comparison (or the lookup itself) was Indeterminate.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<MatchResult> {
        let function = ctx.registry().resolve(&self.function_id)?;
        let candidates = match ctx.resolve(&self.designator) {
            EvaluationValue::Bag(bag) => bag,
            EvaluationValue::Indeterminate(status) => return Ok(MatchResult::Indeterminate(status)),
            other => {
                return Ok(MatchResult::Indeterminate(Status::processing_error(format!(
                    "designator produced {}",
                    other.describe()
                ))));
            }
        };

        let literal = EvaluationValue::Value(self.value.clone());
        MatchResult::any(candidates.iter().map(|candidate| {
            let args = [literal.clone(), EvaluationValue::Value(candidate.clone())];
            Ok(match invoke(function.as_ref(), ctx, &args)? {
                EvaluationValue::Value(AttributeValue::Boolean(true)) => MatchResult::Match,
                EvaluationValue::Value(AttributeValue::Boolean(false)) => MatchResult::NoMatch,
                EvaluationValue::Indeterminate(status) => MatchResult::Indeterminate(status),
                other => MatchResult::Indeterminate(Status::processing_error(format!(
                    "match function {} returned {}",
                    function.id(),
                    other.describe()
                ))),
            })
        }))
    }

    fn validate(&self, registry: &FunctionRegistry) -> Result<()> {
        let function = registry.resolve(&self.function_id)?;
        function.arguments().check_arity(function.id(), 2)?;
        if function
            .returns()
            .is_some_and(|r| r != Param::Value(DataType::Boolean))
        {
            return Err(EvalError::argument(
                function.id(),
                "match functions must return a boolean",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Target
// ============================================================================

/// A conjunction of matches testing one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetItem {
    pub category: Category,
    pub matches: Vec<Match>,
}

impl TargetItem {
    pub fn new(category: Category, matches: impl IntoIterator<Item = Match>) -> Self {
        Self {
            category,
            matches: matches.into_iter().collect(),
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<MatchResult> {
        MatchResult::all(self.matches.iter().map(|m| m.evaluate(ctx)))
    }
}

/// The applicability condition of a rule, policy or policy set. The empty
/// target matches every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub items: Vec<TargetItem>,
}

impl Target {
    /// The target that matches everything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: TargetItem) -> Self {
        self.items.push(item);
        self
    }

    /// Adds an item holding a single match.
    pub fn with_match(self, category: Category, m: Match) -> Self {
        self.with_item(TargetItem::new(category, [m]))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<MatchResult> {
        MatchResult::all(Category::ALL.into_iter().map(|category| {
            let mut items = self
                .items
                .iter()
                .filter(|item| item.category == category)
                .peekable();
            if items.peek().is_none() {
                return Ok(MatchResult::Match);
            }
            MatchResult::any(items.map(|item| item.evaluate(ctx)))
        }))
    }

    pub(crate) fn validate(&self, registry: &FunctionRegistry) -> Result<()> {
        self.items
            .iter()
            .flat_map(|item| &item.matches)
            .try_for_each(|m| m.validate(registry))
    }
}
