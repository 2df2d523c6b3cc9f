//! Higher-order bag functions.
//!
//! Each takes a function reference first and applies it across bag
//! elements. The applied function must return a boolean (except for `map`);
//! any other result makes the whole call Indeterminate. Evaluation stops as
//! soon as the outcome is known.

use basalt_types::{AttributeValue, Bag};

use super::{
    Arguments, Builtin, Function, FunctionRegistry, Param, XACML_1_0, bag_arg, boolean_result,
    function_arg, invoke, value_arg,
};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::value::EvaluationValue;

/// A three-valued predicate result.
enum Truth {
    Known(bool),
    Unknown(EvaluationValue),
}

fn test(
    function: &dyn Function,
    ctx: &EvaluationContext<'_>,
    args: &[&AttributeValue],
) -> Result<Truth> {
    let args: Vec<EvaluationValue> = args
        .iter()
        .map(|v| EvaluationValue::Value((*v).clone()))
        .collect();
    let result = invoke(function, ctx, &args)?;
    Ok(match result {
        EvaluationValue::Value(AttributeValue::Boolean(b)) => Truth::Known(b),
        EvaluationValue::Indeterminate(_) => Truth::Unknown(result),
        other => Truth::Unknown(EvaluationValue::processing_error(format!(
            "{} returned {} where a boolean is required",
            function.id(),
            other.describe()
        ))),
    })
}

/// Three-valued existential: true on the first true, otherwise the first
/// unknown, otherwise false. With `negate`, each result is inverted first.
fn exists(
    items: impl IntoIterator<Item = Result<Truth>>,
    negate: bool,
) -> Result<EvaluationValue> {
    let mut unknown = None;
    for item in items {
        match item? {
            Truth::Known(b) if b != negate => return Ok(EvaluationValue::boolean(true)),
            Truth::Known(_) => {}
            Truth::Unknown(value) => {
                unknown.get_or_insert(value);
            }
        }
    }
    Ok(unknown.unwrap_or_else(|| EvaluationValue::boolean(false)))
}

/// Three-valued universal: false on the first false, otherwise the first
/// unknown, otherwise true.
fn for_all(items: impl IntoIterator<Item = Result<Truth>>) -> Result<EvaluationValue> {
    // forall x. p(x)  ==  not exists x. not p(x)
    Ok(match exists(items, true)? {
        EvaluationValue::Value(AttributeValue::Boolean(b)) => EvaluationValue::boolean(!b),
        unknown => unknown,
    })
}

fn truth_of(value: EvaluationValue) -> Truth {
    match value {
        EvaluationValue::Value(AttributeValue::Boolean(b)) => Truth::Known(b),
        other => Truth::Unknown(other),
    }
}

fn map(
    function: &dyn Function,
    ctx: &EvaluationContext<'_>,
    bag: &Bag,
) -> Result<EvaluationValue> {
    let mut results = Vec::with_capacity(bag.len());
    for element in bag {
        match invoke(function, ctx, &[EvaluationValue::Value(element.clone())])? {
            EvaluationValue::Value(value) => results.push(value),
            indeterminate @ EvaluationValue::Indeterminate(_) => return Ok(indeterminate),
            other => {
                return Ok(EvaluationValue::processing_error(format!(
                    "{} returned {} where a single value is required",
                    function.id(),
                    other.describe()
                )));
            }
        }
    }

    let data_type = match (function.returns(), results.first()) {
        (Some(Param::Value(data_type)), _) => data_type,
        (_, Some(first)) => first.data_type(),
        (_, None) => {
            return Ok(EvaluationValue::processing_error(format!(
                "{} has no declared single-value result type",
                function.id()
            )));
        }
    };
    Ok(EvaluationValue::Bag(Bag::new(data_type, results)?))
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    let value_and_bag = || Arguments::fixed([Param::Function, Param::AnyValue, Param::AnyBag]);
    let two_bags = || Arguments::fixed([Param::Function, Param::AnyBag, Param::AnyBag]);

    registry.add(Builtin::new(
        format!("{XACML_1_0}any-of"),
        value_and_bag(),
        boolean_result(),
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            let value = value_arg(args, 1)?;
            exists(bag_arg(args, 2)?.iter().map(|e| test(f, ctx, &[value, e])), false)
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}all-of"),
        value_and_bag(),
        boolean_result(),
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            let value = value_arg(args, 1)?;
            for_all(bag_arg(args, 2)?.iter().map(|e| test(f, ctx, &[value, e])))
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}any-of-any"),
        two_bags(),
        boolean_result(),
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            let (first, second) = (bag_arg(args, 1)?, bag_arg(args, 2)?);
            exists(
                first
                    .iter()
                    .flat_map(|a| second.iter().map(move |b| test(f, ctx, &[a, b]))),
                false,
            )
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}all-of-all"),
        two_bags(),
        boolean_result(),
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            let (first, second) = (bag_arg(args, 1)?, bag_arg(args, 2)?);
            for_all(
                first
                    .iter()
                    .flat_map(|a| second.iter().map(move |b| test(f, ctx, &[a, b]))),
            )
        },
    ));

    // Every element of the first bag has a match in the second.
    registry.add(Builtin::new(
        format!("{XACML_1_0}all-of-any"),
        two_bags(),
        boolean_result(),
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            let (first, second) = (bag_arg(args, 1)?, bag_arg(args, 2)?);
            for_all(first.iter().map(|a| {
                let matched = exists(second.iter().map(|b| test(f, ctx, &[a, b])), false)?;
                Ok(truth_of(matched))
            }))
        },
    ));

    // True only when no pair of elements satisfies the function: every
    // element of the first bag fails against every element of the second.
    registry.add(Builtin::new(
        format!("{XACML_1_0}any-of-all"),
        two_bags(),
        boolean_result(),
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            let (first, second) = (bag_arg(args, 1)?, bag_arg(args, 2)?);
            let any_pair = exists(
                first
                    .iter()
                    .flat_map(|a| second.iter().map(move |b| test(f, ctx, &[a, b]))),
                false,
            )?;
            Ok(match any_pair {
                EvaluationValue::Value(AttributeValue::Boolean(b)) => EvaluationValue::boolean(!b),
                unknown => unknown,
            })
        },
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}map"),
        Arguments::fixed([Param::Function, Param::Any]),
        None,
        |ctx, args| {
            let f = function_arg(args, 0)?.as_ref();
            match args.get(1) {
                Some(EvaluationValue::Bag(bag)) => map(f, ctx, bag),
                _ => Ok(EvaluationValue::boolean(false)),
            }
        },
    ));
}
