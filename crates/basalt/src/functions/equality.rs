//! `<type>-equal` for every data type, plus `string-equal-ignore-case`.

use basalt_types::DataType;

use super::{
    Arguments, Builtin, FunctionRegistry, Param, XACML_3_0, boolean_result, string_arg,
    type_prefix, value_arg,
};
use crate::value::EvaluationValue;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for data_type in DataType::ALL {
        registry.add(Builtin::new(
            format!("{}{}-equal", type_prefix(data_type), data_type.short_name()),
            Arguments::fixed([Param::Value(data_type), Param::Value(data_type)]),
            boolean_result(),
            |_, args| {
                let equal = value_arg(args, 0)?.equals(value_arg(args, 1)?)?;
                Ok(EvaluationValue::boolean(equal))
            },
        ));
    }

    registry.add(Builtin::new(
        format!("{XACML_3_0}string-equal-ignore-case"),
        Arguments::fixed([Param::Value(DataType::String), Param::Value(DataType::String)]),
        boolean_result(),
        |_, args| {
            let a = string_arg(args, 0)?;
            let b = string_arg(args, 1)?;
            Ok(EvaluationValue::boolean(a.to_lowercase() == b.to_lowercase()))
        },
    ));
}
