//! `and`, `or`, `not` and `n-of`.
//!
//! `and` and `or` declare a short-circuit value: a `false` operand decides
//! `and`, a `true` operand decides `or`, even when other operands are
//! Indeterminate.

use basalt_types::DataType;

use super::{
    Arguments, Builtin, FunctionRegistry, Param, XACML_1_0, bool_arg, boolean_result, integer_arg,
};
use crate::value::EvaluationValue;

const BOOLEAN: Param = Param::Value(DataType::Boolean);

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add(
        Builtin::new(
            format!("{XACML_1_0}or"),
            Arguments::variadic(BOOLEAN, 0),
            boolean_result(),
            |_, args| {
                for index in 0..args.len() {
                    if bool_arg(args, index)? {
                        return Ok(EvaluationValue::boolean(true));
                    }
                }
                Ok(EvaluationValue::boolean(false))
            },
        )
        .with_short_circuit(true),
    );

    registry.add(
        Builtin::new(
            format!("{XACML_1_0}and"),
            Arguments::variadic(BOOLEAN, 0),
            boolean_result(),
            |_, args| {
                for index in 0..args.len() {
                    if !bool_arg(args, index)? {
                        return Ok(EvaluationValue::boolean(false));
                    }
                }
                Ok(EvaluationValue::boolean(true))
            },
        )
        .with_short_circuit(false),
    );

    registry.add(Builtin::new(
        format!("{XACML_1_0}not"),
        Arguments::fixed([BOOLEAN]),
        boolean_result(),
        |_, args| Ok(EvaluationValue::boolean(!bool_arg(args, 0)?)),
    ));

    registry.add(Builtin::new(
        format!("{XACML_1_0}n-of"),
        Arguments::Variadic {
            leading: vec![Param::Value(DataType::Integer)],
            repeated: BOOLEAN,
            min_repeated: 0,
        },
        boolean_result(),
        |_, args| {
            let required = integer_arg(args, 0)?;
            let available = args.len() - 1;
            let Ok(required) = usize::try_from(required) else {
                return Ok(EvaluationValue::processing_error(format!(
                    "n-of requires a non-negative count, got {required}"
                )));
            };
            if required > available {
                return Ok(EvaluationValue::processing_error(format!(
                    "n-of requires {required} of only {available} arguments"
                )));
            }
            let mut satisfied = 0;
            for index in 1..args.len() {
                if satisfied >= required {
                    break;
                }
                if bool_arg(args, index)? {
                    satisfied += 1;
                }
            }
            Ok(EvaluationValue::boolean(satisfied >= required))
        },
    ));
}
