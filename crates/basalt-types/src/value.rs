//! Typed attribute values.
//!
//! An `AttributeValue` can only be built from a literal that is valid for its
//! data type, so every value reaching the evaluator is well-formed.

use std::cmp::Ordering;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::DataType;
use crate::error::{Result, TypeError};
use crate::names::{AnyUri, Rfc822Name, X500Name};
use crate::temporal::{self, DayTimeDuration, XsDate, XsTime, YearMonthDuration};

// ============================================================================
// AttributeValue
// ============================================================================

/// A single typed value.
///
/// Equality follows each type's own rules (see [`AttributeValue::equals`]);
/// values of different data types are never equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawValue", into = "RawValue")]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Date(XsDate),
    Time(XsTime),
    DateTime(DateTime<FixedOffset>),
    DayTimeDuration(DayTimeDuration),
    YearMonthDuration(YearMonthDuration),
    AnyUri(AnyUri),
    HexBinary(Vec<u8>),
    Base64Binary(Vec<u8>),
    Rfc822Name(Rfc822Name),
    X500Name(X500Name),
}

impl AttributeValue {
    /// Parses a literal in the canonical lexical space of `data_type`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::MalformedLiteral`] when the literal is not a valid
    /// encoding for the data type.
    pub fn parse(data_type: DataType, literal: &str) -> Result<Self> {
        let malformed = |reason: String| TypeError::malformed(data_type, literal, reason);

        let value = match data_type {
            DataType::String => Self::String(literal.to_string()),
            DataType::Boolean => match literal {
                "true" | "1" => Self::Boolean(true),
                "false" | "0" => Self::Boolean(false),
                _ => return Err(malformed("expected true, false, 1 or 0".to_string())),
            },
            DataType::Integer => Self::Integer(
                literal
                    .parse::<i64>()
                    .map_err(|e| malformed(e.to_string()))?,
            ),
            DataType::Double => Self::Double(parse_double(literal).map_err(malformed)?),
            DataType::Date => Self::Date(XsDate::parse(literal).map_err(malformed)?),
            DataType::Time => Self::Time(XsTime::parse(literal).map_err(malformed)?),
            DataType::DateTime => {
                Self::DateTime(temporal::parse_date_time(literal).map_err(malformed)?)
            }
            DataType::DayTimeDuration => {
                Self::DayTimeDuration(DayTimeDuration::parse(literal).map_err(malformed)?)
            }
            DataType::YearMonthDuration => {
                Self::YearMonthDuration(YearMonthDuration::parse(literal).map_err(malformed)?)
            }
            DataType::AnyUri => Self::AnyUri(AnyUri::parse(literal).map_err(malformed)?),
            DataType::HexBinary => Self::HexBinary(decode_hex(literal).map_err(malformed)?),
            DataType::Base64Binary => {
                let compact: String = literal.chars().filter(|c| !c.is_whitespace()).collect();
                Self::Base64Binary(
                    BASE64
                        .decode(compact.as_bytes())
                        .map_err(|e| malformed(e.to_string()))?,
                )
            }
            DataType::Rfc822Name => Self::Rfc822Name(Rfc822Name::parse(literal).map_err(malformed)?),
            DataType::X500Name => Self::X500Name(X500Name::parse(literal).map_err(malformed)?),
        };
        Ok(value)
    }

    /// Parses a literal whose data type is given by identifier.
    pub fn parse_with_uri(data_type: &str, literal: &str) -> Result<Self> {
        Self::parse(DataType::from_uri(data_type)?, literal)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn boolean(value: bool) -> Self {
        Self::Boolean(value)
    }

    pub fn integer(value: i64) -> Self {
        Self::Integer(value)
    }

    pub fn double(value: f64) -> Self {
        Self::Double(value)
    }

    /// The data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Boolean(_) => DataType::Boolean,
            Self::Integer(_) => DataType::Integer,
            Self::Double(_) => DataType::Double,
            Self::Date(_) => DataType::Date,
            Self::Time(_) => DataType::Time,
            Self::DateTime(_) => DataType::DateTime,
            Self::DayTimeDuration(_) => DataType::DayTimeDuration,
            Self::YearMonthDuration(_) => DataType::YearMonthDuration,
            Self::AnyUri(_) => DataType::AnyUri,
            Self::HexBinary(_) => DataType::HexBinary,
            Self::Base64Binary(_) => DataType::Base64Binary,
            Self::Rfc822Name(_) => DataType::Rfc822Name,
            Self::X500Name(_) => DataType::X500Name,
        }
    }

    /// The canonical textual encoding. Parsing it with [`Self::parse`] yields
    /// an equal value.
    pub fn encode(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Double(d) => encode_double(*d),
            Self::Date(d) => d.to_string(),
            Self::Time(t) => t.to_string(),
            Self::DateTime(dt) => temporal::format_date_time(dt),
            Self::DayTimeDuration(d) => d.to_string(),
            Self::YearMonthDuration(d) => d.to_string(),
            Self::AnyUri(u) => u.to_string(),
            Self::HexBinary(bytes) => encode_hex(bytes),
            Self::Base64Binary(bytes) => BASE64.encode(bytes),
            Self::Rfc822Name(n) => n.to_string(),
            Self::X500Name(n) => n.to_string(),
        }
    }

    /// Type-aware equality.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::TypeMismatch`] when the operands have different
    /// data types.
    pub fn equals(&self, other: &Self) -> Result<bool> {
        let equal = match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            // NaN is identical to itself in the value space.
            #[allow(clippy::float_cmp)]
            (Self::Double(a), Self::Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::DayTimeDuration(a), Self::DayTimeDuration(b)) => a == b,
            (Self::YearMonthDuration(a), Self::YearMonthDuration(b)) => a == b,
            (Self::AnyUri(a), Self::AnyUri(b)) => a == b,
            (Self::HexBinary(a), Self::HexBinary(b))
            | (Self::Base64Binary(a), Self::Base64Binary(b)) => a == b,
            (Self::Rfc822Name(a), Self::Rfc822Name(b)) => a == b,
            (Self::X500Name(a), Self::X500Name(b)) => a == b,
            _ => return Err(TypeError::mismatch(self.data_type(), other.data_type())),
        };
        Ok(equal)
    }

    /// Total comparison for ordered data types.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::TypeMismatch`] for operands of different types
    /// and [`TypeError::NotOrdered`] for types without an order.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        if self.data_type() != other.data_type() {
            return Err(TypeError::mismatch(self.data_type(), other.data_type()));
        }
        let ordering = match (self, other) {
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)),
            (Self::Date(a), Self::Date(b)) => a.date.cmp(&b.date),
            (Self::Time(a), Self::Time(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::DayTimeDuration(a), Self::DayTimeDuration(b)) => a.cmp(b),
            (Self::YearMonthDuration(a), Self::YearMonthDuration(b)) => a.cmp(b),
            _ => return Err(TypeError::NotOrdered(self.data_type())),
        };
        Ok(ordering)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// ============================================================================
// Serde representation
// ============================================================================

/// Wire form of an attribute value: the data type URI plus canonical text.
#[derive(Serialize, Deserialize)]
struct RawValue {
    data_type: DataType,
    value: String,
}

impl TryFrom<RawValue> for AttributeValue {
    type Error = TypeError;

    fn try_from(raw: RawValue) -> Result<Self> {
        Self::parse(raw.data_type, &raw.value)
    }
}

impl From<AttributeValue> for RawValue {
    fn from(value: AttributeValue) -> Self {
        Self {
            data_type: value.data_type(),
            value: value.encode(),
        }
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn parse_double(literal: &str) -> std::result::Result<f64, String> {
    match literal {
        "INF" | "+INF" => return Ok(f64::INFINITY),
        "-INF" => return Ok(f64::NEG_INFINITY),
        "NaN" => return Ok(f64::NAN),
        _ => {}
    }
    // Rust also accepts "inf" and "nan" spellings, which XML Schema does not.
    if literal.is_empty() || !literal.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) {
        return Err("not a decimal or scientific number".to_string());
    }
    literal.parse::<f64>().map_err(|e| e.to_string())
}

fn encode_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        format!("{value:?}")
    }
}

fn decode_hex(literal: &str) -> std::result::Result<Vec<u8>, String> {
    if !literal.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("expected only hex digits".to_string());
    }
    if literal.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }
    literal
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).map_err(|e| e.to_string())?;
            u8::from_str_radix(text, 16).map_err(|e| e.to_string())
        })
        .collect()
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

// ============================================================================
// Tests
// ============================================================================
