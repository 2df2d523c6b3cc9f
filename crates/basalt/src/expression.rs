//! Condition expressions.

use basalt_types::{AttributeValue, DataType};
use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::{EvalError, Result};
use crate::functions::{FunctionRegistry, invoke};
use crate::request::Category;
use crate::value::EvaluationValue;

// ============================================================================
// AttributeDesignator
// ============================================================================

/// A reference to request attributes by category, identifier and data type.
/// Evaluates to a bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDesignator {
    pub category: Category,
    pub attribute_id: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Absence yields Indeterminate (missing-attribute) instead of an empty
    /// bag.
    #[serde(default)]
    pub must_be_present: bool,
}

impl AttributeDesignator {
    pub fn new(category: Category, attribute_id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            category,
            attribute_id: attribute_id.into(),
            data_type,
            issuer: None,
            must_be_present: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.must_be_present = true;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

// ============================================================================
// Expression
// ============================================================================

/// A node of an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// A literal.
    Value(AttributeValue),
    Designator(AttributeDesignator),
    /// A function application.
    Apply(Apply),
    /// A function reference, passed to higher-order functions.
    Function(String),
    /// A reference to a variable defined by the enclosing policy.
    VariableReference(String),
}

/// Application of a function to argument expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Apply {
    pub function_id: String,
    #[serde(default)]
    pub arguments: Vec<Expression>,
}

/// A named expression shared by the rules of one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    pub id: String,
    pub expression: Expression,
}

impl VariableDefinition {
    pub fn new(id: impl Into<String>, expression: Expression) -> Self {
        Self {
            id: id.into(),
            expression,
        }
    }
}

impl Expression {
    pub fn apply(function_id: impl Into<String>, arguments: impl IntoIterator<Item = Expression>) -> Self {
        Self::Apply(Apply {
            function_id: function_id.into(),
            arguments: arguments.into_iter().collect(),
        })
    }

    pub fn value(value: impl Into<AttributeValue>) -> Self {
        Self::Value(value.into())
    }

    pub fn function(function_id: impl Into<String>) -> Self {
        Self::Function(function_id.into())
    }

    pub fn variable(id: impl Into<String>) -> Self {
        Self::VariableReference(id.into())
    }

    /// Evaluates the expression against the request in `ctx`.
    ///
    /// Request-dependent failures are returned as Indeterminate values.
    ///
    /// # Errors
    ///
    /// Structural defects: unknown functions, undefined variables, arity
    /// mismatches and variable chains deeper than the configured maximum.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<EvaluationValue> {
        match self {
            Self::Value(value) => Ok(EvaluationValue::Value(value.clone())),
            Self::Designator(designator) => Ok(ctx.resolve(designator)),
            Self::Function(id) => Ok(EvaluationValue::Function(ctx.registry().resolve(id)?)),
            Self::VariableReference(id) => {
                let definition = ctx.variable(id)?;
                definition.expression.evaluate(&ctx.descend()?)
            }
            Self::Apply(apply) => apply.evaluate(ctx),
        }
    }

    /// Checks function identifiers, application arities and variable
    /// references without a request.
    pub fn validate(
        &self,
        registry: &FunctionRegistry,
        variables: &[VariableDefinition],
    ) -> Result<()> {
        match self {
            Self::Value(_) | Self::Designator(_) => Ok(()),
            Self::Function(id) => registry.resolve(id).map(drop),
            Self::VariableReference(id) => {
                if variables.iter().any(|v| &v.id == id) {
                    Ok(())
                } else {
                    Err(EvalError::UndefinedVariable(id.clone()))
                }
            }
            Self::Apply(apply) => {
                let function = registry.resolve(&apply.function_id)?;
                function
                    .arguments()
                    .check_arity(function.id(), apply.arguments.len())?;
                apply
                    .arguments
                    .iter()
                    .try_for_each(|arg| arg.validate(registry, variables))
            }
        }
    }
}

impl Apply {
    /// Evaluates arguments in order, stopping early when an argument
    /// carries the function's short-circuit value.
    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<EvaluationValue> {
        let function = ctx.registry().resolve(&self.function_id)?;
        let decisive = function.short_circuit().map(EvaluationValue::boolean);

        let mut args = Vec::with_capacity(self.arguments.len());
        for argument in &self.arguments {
            let value = argument.evaluate(ctx)?;
            if decisive.as_ref() == Some(&value) {
                return Ok(value);
            }
            args.push(value);
        }
        invoke(function.as_ref(), ctx, &args)
    }
}

impl From<AttributeValue> for Expression {
    fn from(value: AttributeValue) -> Self {
        Self::Value(value)
    }
}

impl From<AttributeDesignator> for Expression {
    fn from(designator: AttributeDesignator) -> Self {
        Self::Designator(designator)
    }
}
