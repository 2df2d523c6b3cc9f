//! Bags: unordered multisets of same-typed values.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::{AttributeValue, DataType};

/// An unordered, possibly empty multiset of values sharing one data type.
///
/// An empty bag is a real value. Whether an attribute was absent from a
/// request is decided by the caller that produced the bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawBag")]
pub struct Bag {
    data_type: DataType,
    values: Vec<AttributeValue>,
}

impl Bag {
    /// Builds a bag, checking that every value has `data_type`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::MixedBag`] for the first value of another type.
    pub fn new(data_type: DataType, values: Vec<AttributeValue>) -> Result<Self> {
        if let Some(stray) = values.iter().find(|v| v.data_type() != data_type) {
            return Err(TypeError::MixedBag {
                expected: data_type,
                found: stray.data_type(),
            });
        }
        Ok(Self { data_type, values })
    }

    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            values: Vec::new(),
        }
    }

    pub fn singleton(value: AttributeValue) -> Self {
        Self {
            data_type: value.data_type(),
            values: vec![value],
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates the elements. The sequence can be restarted by calling
    /// `iter` again.
    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.values.iter()
    }

    /// Whether any element equals `value`.
    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Number of elements equal to `value`.
    pub fn count(&self, value: &AttributeValue) -> usize {
        self.values.iter().filter(|v| *v == value).count()
    }

    /// The elements with duplicates removed, first occurrence kept.
    pub fn distinct(&self) -> Vec<AttributeValue> {
        let mut seen: Vec<AttributeValue> = Vec::with_capacity(self.values.len());
        for value in &self.values {
            if !seen.contains(value) {
                seen.push(value.clone());
            }
        }
        seen
    }

    pub fn into_values(self) -> Vec<AttributeValue> {
        self.values
    }
}

/// Multiset equality: same data type and the same multiplicity for every
/// element, regardless of order.
impl PartialEq for Bag {
    fn eq(&self, other: &Self) -> bool {
        self.data_type == other.data_type
            && self.len() == other.len()
            && self.values.iter().all(|v| self.count(v) == other.count(v))
    }
}

impl<'a> IntoIterator for &'a Bag {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[derive(Deserialize)]
struct RawBag {
    data_type: DataType,
    values: Vec<AttributeValue>,
}

impl TryFrom<RawBag> for Bag {
    type Error = TypeError;

    fn try_from(raw: RawBag) -> Result<Self> {
        Self::new(raw.data_type, raw.values)
    }
}

// ============================================================================
// Tests
// ============================================================================
