//! Evaluation errors.

use basalt_types::TypeError;
use thiserror::Error;

use crate::combining::CombiningScope;

/// Errors raised while evaluating policies.
///
/// Only [`EvalError::Type`] is recoverable: the function application that
/// raised it turns it into an Indeterminate value. Every other variant is a
/// defect in the policy tree or in the calling code and aborts evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A function was invoked with the wrong number of arguments.
    #[error("invalid arguments to {function}: {reason}")]
    Argument { function: String, reason: String },

    /// An operand has the wrong data type or shape.
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("unknown combining algorithm: {0}")]
    UnknownCombiningAlgorithm(String),

    /// A combining algorithm was used where it is not defined, such as
    /// only-one-applicable inside a policy.
    #[error("combining algorithm {algorithm} cannot combine {scope}")]
    InvalidCombiningScope {
        algorithm: String,
        scope: CombiningScope,
    },

    #[error("function already registered: {0}")]
    DuplicateFunction(String),

    #[error("policy reference cannot be resolved: {0}")]
    UnresolvedReference(String),

    #[error("variable is not defined: {0}")]
    UndefinedVariable(String),

    #[error("policy nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
}

impl EvalError {
    pub(crate) fn argument(function: &str, reason: impl Into<String>) -> Self {
        Self::Argument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a defect of the policy tree or caller rather than
    /// a property of the request being evaluated.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Type(_))
    }
}

/// Result type for evaluation.
pub type Result<T> = std::result::Result<T, EvalError>;
