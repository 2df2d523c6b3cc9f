//! # basalt-types: Typed values for the `basalt` policy engine
//!
//! This crate is the single source of truth for "is this value well-formed":
//! - Data type registry ([`DataType`]) keyed by XACML / XML Schema identifiers
//! - Typed values ([`AttributeValue`]) with canonical encoding, type-aware
//!   equality and ordering
//! - Bags ([`Bag`]): unordered multisets of same-typed values
//! - Calendar, duration and name types used by the values
//!
//! # Examples
//!
//! ```
//! use basalt_types::{AttributeValue, DataType};
//!
//! let when = AttributeValue::parse_with_uri(
//!     "http://www.w3.org/2001/XMLSchema#dateTime",
//!     "2024-05-01T09:30:00+02:00",
//! )
//! .unwrap();
//! assert_eq!(when.data_type(), DataType::DateTime);
//! assert_eq!(when.encode(), "2024-05-01T09:30:00+02:00");
//! ```

mod bag;
mod datatype;
mod error;
mod names;
mod temporal;
mod value;

pub use bag::Bag;
pub use datatype::DataType;
pub use error::{Result, TypeError};
pub use names::{AnyUri, Rfc822Name, X500Name};
pub use temporal::{DayTimeDuration, XsDate, XsTime, YearMonthDuration, add_months_to_date_time};
pub use value::AttributeValue;
