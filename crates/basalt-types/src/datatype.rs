//! The data type registry.
//!
//! Every attribute value carries one of these identifiers. Lookup by URI is
//! the only way to obtain a `DataType` from policy text, so an unknown
//! identifier is rejected before any value is constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const XML_SCHEMA: &str = "http://www.w3.org/2001/XMLSchema#";
const XQUERY_OPERATORS: &str = "http://www.w3.org/TR/2002/WD-xquery-operators-20020816#";
const XACML_DATA_TYPE: &str = "urn:oasis:names:tc:xacml:1.0:data-type:";

// ============================================================================
// DataType
// ============================================================================

/// A built-in attribute data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    String,
    Boolean,
    Integer,
    Double,
    Date,
    Time,
    DateTime,
    DayTimeDuration,
    YearMonthDuration,
    AnyUri,
    HexBinary,
    Base64Binary,
    Rfc822Name,
    X500Name,
}

impl DataType {
    /// Every registered data type, in a stable order.
    pub const ALL: [DataType; 14] = [
        DataType::String,
        DataType::Boolean,
        DataType::Integer,
        DataType::Double,
        DataType::Date,
        DataType::Time,
        DataType::DateTime,
        DataType::DayTimeDuration,
        DataType::YearMonthDuration,
        DataType::AnyUri,
        DataType::HexBinary,
        DataType::Base64Binary,
        DataType::Rfc822Name,
        DataType::X500Name,
    ];

    /// The short name used inside function identifiers (e.g. `dateTime`).
    pub fn short_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "dateTime",
            Self::DayTimeDuration => "dayTimeDuration",
            Self::YearMonthDuration => "yearMonthDuration",
            Self::AnyUri => "anyURI",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
            Self::Rfc822Name => "rfc822Name",
            Self::X500Name => "x500Name",
        }
    }

    /// The canonical identifier URI.
    pub fn uri(self) -> String {
        match self {
            Self::Rfc822Name | Self::X500Name => format!("{XACML_DATA_TYPE}{}", self.short_name()),
            _ => format!("{XML_SCHEMA}{}", self.short_name()),
        }
    }

    /// Looks up a data type by identifier.
    ///
    /// Accepts the canonical URIs plus the legacy XQuery-operators URIs for
    /// the two duration types.
    pub fn from_uri(uri: &str) -> Result<Self, TypeError> {
        let by_short = |name: &str| Self::ALL.into_iter().find(|dt| dt.short_name() == name);

        let found = if let Some(name) = uri.strip_prefix(XML_SCHEMA) {
            by_short(name).filter(|dt| !matches!(dt, Self::Rfc822Name | Self::X500Name))
        } else if let Some(name) = uri.strip_prefix(XACML_DATA_TYPE) {
            by_short(name).filter(|dt| matches!(dt, Self::Rfc822Name | Self::X500Name))
        } else if let Some(name) = uri.strip_prefix(XQUERY_OPERATORS) {
            by_short(name)
                .filter(|dt| matches!(dt, Self::DayTimeDuration | Self::YearMonthDuration))
        } else {
            None
        };

        found.ok_or_else(|| TypeError::UnsupportedDataType(uri.to_string()))
    }

    /// Whether values of this type have a total order usable by comparison
    /// functions.
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            Self::String
                | Self::Integer
                | Self::Double
                | Self::Date
                | Self::Time
                | Self::DateTime
                | Self::DayTimeDuration
                | Self::YearMonthDuration
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for DataType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl TryFrom<String> for DataType {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_uri(&value)
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.uri()
    }
}

// ============================================================================
// Tests
// ============================================================================
