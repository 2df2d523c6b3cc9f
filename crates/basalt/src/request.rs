//! Access requests: typed attributes grouped by category.

use std::fmt;

use basalt_types::{AttributeValue, Bag, DataType, TypeError};
use serde::{Deserialize, Serialize};

// ============================================================================
// Category
// ============================================================================

/// The attribute category a value belongs to, and the kind of a target
/// item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Subject,
    Resource,
    Action,
    Environment,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Subject,
        Category::Resource,
        Category::Action,
        Category::Environment,
    ];

    /// The XACML category identifier.
    pub fn uri(self) -> &'static str {
        match self {
            Self::Subject => "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject",
            Self::Resource => "urn:oasis:names:tc:xacml:3.0:attribute-category:resource",
            Self::Action => "urn:oasis:names:tc:xacml:3.0:attribute-category:action",
            Self::Environment => "urn:oasis:names:tc:xacml:3.0:attribute-category:environment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => f.write_str("subject"),
            Self::Resource => f.write_str("resource"),
            Self::Action => f.write_str("action"),
            Self::Environment => f.write_str("environment"),
        }
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// One request attribute: an identifier, a category, an optional issuer and
/// a bag of values of one data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAttribute", into = "RawAttribute")]
pub struct Attribute {
    id: String,
    category: Category,
    issuer: Option<String>,
    values: Bag,
}

impl Attribute {
    /// Builds an attribute, checking that every value has `data_type`.
    pub fn new(
        id: impl Into<String>,
        category: Category,
        data_type: DataType,
        values: Vec<AttributeValue>,
    ) -> Result<Self, TypeError> {
        Ok(Self {
            id: id.into(),
            category,
            issuer: None,
            values: Bag::new(data_type, values)?,
        })
    }

    /// A single-valued attribute.
    pub fn single(id: impl Into<String>, category: Category, value: AttributeValue) -> Self {
        Self {
            id: id.into(),
            category,
            issuer: None,
            values: Bag::singleton(value),
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn data_type(&self) -> DataType {
        self.values.data_type()
    }

    pub fn values(&self) -> &Bag {
        &self.values
    }
}

#[derive(Serialize, Deserialize)]
struct RawAttribute {
    id: String,
    category: Category,
    data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer: Option<String>,
    values: Vec<AttributeValue>,
}

impl TryFrom<RawAttribute> for Attribute {
    type Error = TypeError;

    fn try_from(raw: RawAttribute) -> Result<Self, TypeError> {
        let mut attribute = Self::new(raw.id, raw.category, raw.data_type, raw.values)?;
        attribute.issuer = raw.issuer;
        Ok(attribute)
    }
}

impl From<Attribute> for RawAttribute {
    fn from(attribute: Attribute) -> Self {
        Self {
            id: attribute.id,
            category: attribute.category,
            data_type: attribute.values.data_type(),
            issuer: attribute.issuer,
            values: attribute.values.into_values(),
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// An access request. Immutable once handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    attributes: Vec<Attribute>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a single-valued attribute.
    pub fn with(
        self,
        category: Category,
        id: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.with_attribute(Attribute::single(id, category, value.into()))
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Attributes of one category.
    pub fn category(&self, category: Category) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(move |a| a.category == category)
    }

    /// Collects the values of every attribute with this category, id and
    /// data type (and issuer, when given).
    ///
    /// Returns `None` when no such attribute exists. An attribute present
    /// with no values yields an empty bag.
    pub fn lookup(
        &self,
        category: Category,
        attribute_id: &str,
        data_type: DataType,
        issuer: Option<&str>,
    ) -> Option<Bag> {
        let mut found = false;
        let mut values = Vec::new();
        for attribute in self.category(category) {
            if attribute.id != attribute_id || attribute.data_type() != data_type {
                continue;
            }
            if issuer.is_some() && attribute.issuer() != issuer {
                continue;
            }
            found = true;
            values.extend(attribute.values.iter().cloned());
        }
        found.then(|| Bag::new(data_type, values).unwrap_or_else(|_| Bag::empty(data_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new()
            .with(Category::Subject, "role", "doctor")
            .with(Category::Subject, "role", "auditor")
            .with(Category::Resource, "resource-id", "doc1")
            .with_attribute(
                Attribute::single("clearance", Category::Subject, AttributeValue::integer(3))
                    .with_issuer("hr"),
            )
    }

    #[test]
    fn test_lookup_merges_attributes_with_the_same_id() {
        let roles = request()
            .lookup(Category::Subject, "role", DataType::String, None)
            .expect("present");
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn test_lookup_distinguishes_absent_from_empty() {
        let request = request().with_attribute(
            Attribute::new("groups", Category::Subject, DataType::String, vec![])
                .expect("empty attribute"),
        );
        assert!(
            request
                .lookup(Category::Subject, "department", DataType::String, None)
                .is_none()
        );
        let groups = request
            .lookup(Category::Subject, "groups", DataType::String, None)
            .expect("present but empty");
        assert!(groups.is_empty());
    }

    #[test]
    fn test_lookup_filters_by_type_category_and_issuer() {
        let request = request();
        assert!(
            request
                .lookup(Category::Subject, "clearance", DataType::String, None)
                .is_none()
        );
        assert!(
            request
                .lookup(Category::Resource, "role", DataType::String, None)
                .is_none()
        );
        assert!(
            request
                .lookup(Category::Subject, "clearance", DataType::Integer, Some("it"))
                .is_none()
        );
        assert!(
            request
                .lookup(Category::Subject, "clearance", DataType::Integer, Some("hr"))
                .is_some()
        );
    }

    #[test]
    fn test_attribute_deserialization_validates_values() {
        let json = r#"{
            "id": "resource-id",
            "category": "resource",
            "data_type": "http://www.w3.org/2001/XMLSchema#integer",
            "values": [{"data_type": "http://www.w3.org/2001/XMLSchema#string", "value": "doc1"}]
        }"#;
        assert!(serde_json::from_str::<Attribute>(json).is_err());

        let request = request();
        let json = serde_json::to_string(&request).expect("serialize");
        let back: Request = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, request);
    }
}
