//! Per-type bag functions: `-one-and-only`, `-bag-size`, `-is-in`, `-bag`.

use basalt_types::{AttributeValue, Bag, DataType};

use super::{
    Arguments, Builtin, FunctionRegistry, Param, bag_arg, boolean_result, type_prefix, value_arg,
};
use crate::value::EvaluationValue;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for data_type in DataType::ALL {
        let prefix = format!("{}{}", type_prefix(data_type), data_type.short_name());

        registry.add(Builtin::new(
            format!("{prefix}-one-and-only"),
            Arguments::fixed([Param::Bag(data_type)]),
            Some(Param::Value(data_type)),
            |_, args| {
                let bag = bag_arg(args, 0)?;
                match bag.iter().next() {
                    Some(only) if bag.len() == 1 => Ok(EvaluationValue::Value(only.clone())),
                    _ => Ok(EvaluationValue::processing_error(format!(
                        "expected a bag of exactly one value, found {}",
                        bag.len()
                    ))),
                }
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-bag-size"),
            Arguments::fixed([Param::Bag(data_type)]),
            Some(Param::Value(DataType::Integer)),
            |_, args| {
                let size = i64::try_from(bag_arg(args, 0)?.len()).unwrap_or(i64::MAX);
                Ok(EvaluationValue::Value(AttributeValue::Integer(size)))
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-is-in"),
            Arguments::fixed([Param::Value(data_type), Param::Bag(data_type)]),
            boolean_result(),
            |_, args| {
                let value = value_arg(args, 0)?;
                Ok(EvaluationValue::boolean(bag_arg(args, 1)?.contains(value)))
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-bag"),
            Arguments::variadic(Param::Value(data_type), 0),
            Some(Param::Bag(data_type)),
            move |_, args| {
                let values = (0..args.len())
                    .map(|index| value_arg(args, index).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(EvaluationValue::Bag(Bag::new(data_type, values)?))
            },
        ));
    }
}
