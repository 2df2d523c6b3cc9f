//! Ordering comparisons for integer, double, string, date, time and
//! dateTime.

use std::cmp::Ordering;

use basalt_types::DataType;

use super::{Arguments, Builtin, FunctionRegistry, Param, XACML_1_0, boolean_result, value_arg};
use crate::value::EvaluationValue;

const ORDERED: [DataType; 6] = [
    DataType::Integer,
    DataType::Double,
    DataType::String,
    DataType::Date,
    DataType::Time,
    DataType::DateTime,
];

const COMPARISONS: [(&str, fn(Ordering) -> bool); 4] = [
    ("greater-than", Ordering::is_gt),
    ("greater-than-or-equal", Ordering::is_ge),
    ("less-than", Ordering::is_lt),
    ("less-than-or-equal", Ordering::is_le),
];

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for data_type in ORDERED {
        for (name, holds) in COMPARISONS {
            registry.add(Builtin::new(
                format!("{XACML_1_0}{}-{name}", data_type.short_name()),
                Arguments::fixed([Param::Value(data_type), Param::Value(data_type)]),
                boolean_result(),
                move |_, args| {
                    let a = value_arg(args, 0)?;
                    let b = value_arg(args, 1)?;
                    // NaN compares false against everything.
                    if a.as_double().is_some_and(f64::is_nan) || b.as_double().is_some_and(f64::is_nan)
                    {
                        return Ok(EvaluationValue::boolean(false));
                    }
                    Ok(EvaluationValue::boolean(holds(a.compare(b)?)))
                },
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::value::EvaluationValue;
    use basalt_types::DataType;
    use test_case::test_case;

    fn compare(name: &str, data_type: DataType, a: &str, b: &str) -> EvaluationValue {
        let id = format!(
            "urn:oasis:names:tc:xacml:1.0:function:{}-{name}",
            data_type.short_name()
        );
        call(&id, vec![parsed(data_type, a), parsed(data_type, b)])
    }

    #[test_case("greater-than", DataType::Integer, "5", "3", true)]
    #[test_case("greater-than", DataType::Integer, "3", "3", false)]
    #[test_case("greater-than-or-equal", DataType::Integer, "3", "3", true)]
    #[test_case("less-than", DataType::Double, "-INF", "0.5", true)]
    #[test_case("less-than", DataType::String, "apple", "banana", true)]
    #[test_case("less-than-or-equal", DataType::Date, "2024-01-31", "2024-02-01", true)]
    #[test_case("greater-than", DataType::Time, "10:00:00+02:00", "09:00:00Z", false)]
    #[test_case("less-than", DataType::DateTime, "2024-01-01T00:00:00+01:00", "2024-01-01T00:00:00Z", true)]
    fn test_comparisons(name: &str, data_type: DataType, a: &str, b: &str, expected: bool) {
        assert_eq!(
            compare(name, data_type, a, b),
            EvaluationValue::boolean(expected),
            "{data_type}-{name}({a}, {b})"
        );
    }

    #[test]
    fn test_nan_is_never_ordered() {
        for name in ["greater-than", "less-than-or-equal"] {
            assert_eq!(
                compare(name, DataType::Double, "NaN", "1.0"),
                EvaluationValue::boolean(false)
            );
        }
    }

    #[test]
    fn test_unordered_types_have_no_comparisons() {
        let registry = crate::functions::FunctionRegistry::with_builtins();
        assert!(!registry.contains("urn:oasis:names:tc:xacml:1.0:function:boolean-greater-than"));
        assert!(!registry.contains("urn:oasis:names:tc:xacml:1.0:function:anyURI-less-than"));
    }
}
