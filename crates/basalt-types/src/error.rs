//! Errors raised while constructing or comparing typed values.

use thiserror::Error;

use crate::DataType;

/// Error type for data type lookup, literal parsing and typed comparison.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The data type identifier is not registered.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// A literal is not a valid encoding for its declared data type.
    #[error("malformed {data_type} literal '{literal}': {reason}")]
    MalformedLiteral {
        data_type: DataType,
        literal: String,
        reason: String,
    },

    /// Two operands carry different data types.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The data type has no total order.
    #[error("data type {0} is not ordered")]
    NotOrdered(DataType),

    /// A bag was built from values of more than one data type.
    #[error("bag of {expected} cannot hold a {found} value")]
    MixedBag { expected: DataType, found: DataType },
}

impl TypeError {
    pub(crate) fn malformed(data_type: DataType, literal: &str, reason: impl Into<String>) -> Self {
        Self::MalformedLiteral {
            data_type,
            literal: literal.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds a `TypeMismatch` between two data types.
    pub fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Result type for typed value operations.
pub type Result<T> = std::result::Result<T, TypeError>;
