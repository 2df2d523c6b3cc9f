//! The result of evaluating an expression.

use std::fmt;
use std::sync::Arc;

use basalt_types::{AttributeValue, Bag, DataType, TypeError};

use crate::decision::{Status, StatusCode};
use crate::error::Result;
use crate::functions::Function;

/// A single value, a bag, a function reference or an Indeterminate result.
///
/// Indeterminate is an ordinary value here: it flows through function
/// applications and is inspected by the combining algorithms.
#[derive(Clone)]
pub enum EvaluationValue {
    Value(AttributeValue),
    Bag(Bag),
    Function(Arc<dyn Function>),
    Indeterminate(Status),
}

impl EvaluationValue {
    pub fn indeterminate(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Indeterminate(Status::new(code, message))
    }

    pub fn processing_error(message: impl Into<String>) -> Self {
        Self::Indeterminate(Status::processing_error(message))
    }

    pub fn boolean(value: bool) -> Self {
        Self::Value(AttributeValue::Boolean(value))
    }

    pub fn is_bag(&self) -> bool {
        matches!(self, Self::Bag(_))
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate(_))
    }

    /// The elements of a bag; empty for anything that is not a bag.
    pub fn elements(&self) -> std::slice::Iter<'_, AttributeValue> {
        match self {
            Self::Bag(bag) => bag.iter(),
            _ => std::slice::Iter::default(),
        }
    }

    /// The wrapped boolean.
    ///
    /// # Errors
    ///
    /// Returns a type error for anything other than a single boolean.
    pub fn bool_value(&self) -> Result<bool> {
        match self {
            Self::Value(AttributeValue::Boolean(b)) => Ok(*b),
            other => Err(TypeError::mismatch(DataType::Boolean, other.describe()).into()),
        }
    }

    /// The wrapped single value.
    pub fn as_value(&self) -> Option<&AttributeValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&Bag> {
        match self {
            Self::Bag(bag) => Some(bag),
            _ => None,
        }
    }

    /// A short description of the value's shape, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Value(value) => value.data_type().to_string(),
            Self::Bag(bag) => format!("bag of {}", bag.data_type()),
            Self::Function(function) => format!("function {}", function.id()),
            Self::Indeterminate(_) => "indeterminate".to_string(),
        }
    }
}

impl From<AttributeValue> for EvaluationValue {
    fn from(value: AttributeValue) -> Self {
        Self::Value(value)
    }
}

impl From<Bag> for EvaluationValue {
    fn from(bag: Bag) -> Self {
        Self::Bag(bag)
    }
}

impl PartialEq for EvaluationValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Bag(a), Self::Bag(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.id() == b.id(),
            (Self::Indeterminate(a), Self::Indeterminate(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for EvaluationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Bag(bag) => f.debug_tuple("Bag").field(bag).finish(),
            Self::Function(function) => f.debug_tuple("Function").field(&function.id()).finish(),
            Self::Indeterminate(status) => f.debug_tuple("Indeterminate").field(status).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elements_of_non_bag_is_empty() {
        let single = EvaluationValue::from(AttributeValue::integer(3));
        assert_eq!(single.elements().count(), 0);
        assert!(!single.is_bag());

        let bag = Bag::new(
            DataType::Integer,
            vec![AttributeValue::integer(1), AttributeValue::integer(2)],
        )
        .expect("homogeneous bag");
        let value = EvaluationValue::from(bag);
        assert_eq!(value.elements().count(), 2);
        assert_eq!(value.elements().count(), 2, "elements can be restarted");
    }

    #[test]
    fn test_bool_value_requires_a_boolean() {
        assert_eq!(EvaluationValue::boolean(true).bool_value(), Ok(true));
        assert!(EvaluationValue::from(AttributeValue::string("true")).bool_value().is_err());
        assert!(
            EvaluationValue::processing_error("boom")
                .bool_value()
                .is_err()
        );
    }
}
