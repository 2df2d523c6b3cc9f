//! String functions and the name-matching functions.

use basalt_types::{AttributeValue, DataType, TypeError};
use regex::Regex;

use super::{
    Arguments, Builtin, FunctionRegistry, Param, XACML_1_0, XACML_2_0, XACML_3_0, boolean_result,
    string_arg, value_arg,
};
use crate::value::EvaluationValue;

const STRING: Param = Param::Value(DataType::String);

fn string(value: String) -> EvaluationValue {
    EvaluationValue::Value(AttributeValue::String(value))
}

/// Registers a `(needle, haystack) -> boolean` string predicate.
fn predicate(registry: &mut FunctionRegistry, name: &str, test: fn(&str, &str) -> bool) {
    registry.add(Builtin::new(
        format!("{XACML_3_0}{name}"),
        Arguments::fixed([STRING, STRING]),
        boolean_result(),
        move |_, args| {
            let needle = string_arg(args, 0)?;
            let haystack = string_arg(args, 1)?;
            Ok(EvaluationValue::boolean(test(haystack, needle)))
        },
    ));
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add(Builtin::new(
        format!("{XACML_2_0}string-concatenate"),
        Arguments::variadic(STRING, 2),
        Some(STRING),
        |_, args| {
            let mut joined = String::new();
            for index in 0..args.len() {
                joined.push_str(string_arg(args, index)?);
            }
            Ok(string(joined))
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}string-normalize-space"),
        Arguments::fixed([STRING]),
        Some(STRING),
        |_, args| Ok(string(string_arg(args, 0)?.trim().to_string())),
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}string-normalize-to-lower-case"),
        Arguments::fixed([STRING]),
        Some(STRING),
        |_, args| Ok(string(string_arg(args, 0)?.to_lowercase())),
    ));

    predicate(registry, "string-starts-with", |haystack, needle| {
        haystack.starts_with(needle)
    });
    predicate(registry, "string-ends-with", |haystack, needle| {
        haystack.ends_with(needle)
    });
    predicate(registry, "string-contains", |haystack, needle| {
        haystack.contains(needle)
    });

    registry.add(Builtin::new(
        format!("{XACML_1_0}string-regexp-match"),
        Arguments::fixed([STRING, STRING]),
        boolean_result(),
        |_, args| {
            let pattern = string_arg(args, 0)?;
            let subject = string_arg(args, 1)?;
            match Regex::new(pattern) {
                Ok(regex) => Ok(EvaluationValue::boolean(regex.is_match(subject))),
                Err(err) => Ok(EvaluationValue::processing_error(format!(
                    "invalid regular expression '{pattern}': {err}"
                ))),
            }
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}rfc822Name-match"),
        Arguments::fixed([STRING, Param::Value(DataType::Rfc822Name)]),
        boolean_result(),
        |_, args| {
            let pattern = string_arg(args, 0)?;
            match value_arg(args, 1)? {
                AttributeValue::Rfc822Name(name) => {
                    Ok(EvaluationValue::boolean(name.matches_pattern(pattern)))
                }
                other => Err(TypeError::mismatch(DataType::Rfc822Name, other.data_type()).into()),
            }
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}x500Name-match"),
        Arguments::fixed([
            Param::Value(DataType::X500Name),
            Param::Value(DataType::X500Name),
        ]),
        boolean_result(),
        |_, args| match (value_arg(args, 0)?, value_arg(args, 1)?) {
            (AttributeValue::X500Name(suffix), AttributeValue::X500Name(name)) => {
                Ok(EvaluationValue::boolean(suffix.is_suffix_of(name)))
            }
            (a, b) => Err(TypeError::mismatch(a.data_type(), b.data_type()).into()),
        },
    ));
}
