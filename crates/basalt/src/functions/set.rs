//! Per-type set functions over bags. Results never contain duplicates.

use basalt_types::{AttributeValue, Bag, DataType};

use super::{Arguments, Builtin, FunctionRegistry, Param, bag_arg, boolean_result, type_prefix};
use crate::error::Result;
use crate::value::EvaluationValue;

fn subset(a: &Bag, b: &Bag) -> bool {
    a.iter().all(|v| b.contains(v))
}

fn bag_result(data_type: DataType, values: Vec<AttributeValue>) -> Result<EvaluationValue> {
    Ok(EvaluationValue::Bag(Bag::new(data_type, values)?))
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    for data_type in DataType::ALL {
        let prefix = format!("{}{}", type_prefix(data_type), data_type.short_name());
        let pair = || Arguments::fixed([Param::Bag(data_type), Param::Bag(data_type)]);

        registry.add(Builtin::new(
            format!("{prefix}-intersection"),
            pair(),
            Some(Param::Bag(data_type)),
            move |_, args| {
                let a = bag_arg(args, 0)?;
                let b = bag_arg(args, 1)?;
                let common = a.distinct().into_iter().filter(|v| b.contains(v)).collect();
                bag_result(data_type, common)
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-union"),
            pair(),
            Some(Param::Bag(data_type)),
            move |_, args| {
                let a = bag_arg(args, 0)?;
                let b = bag_arg(args, 1)?;
                let mut all = a.distinct();
                for value in b.distinct() {
                    if !all.contains(&value) {
                        all.push(value);
                    }
                }
                bag_result(data_type, all)
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-subset"),
            pair(),
            boolean_result(),
            |_, args| {
                Ok(EvaluationValue::boolean(subset(
                    bag_arg(args, 0)?,
                    bag_arg(args, 1)?,
                )))
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-at-least-one-member-of"),
            pair(),
            boolean_result(),
            |_, args| {
                let a = bag_arg(args, 0)?;
                let b = bag_arg(args, 1)?;
                Ok(EvaluationValue::boolean(a.iter().any(|v| b.contains(v))))
            },
        ));

        registry.add(Builtin::new(
            format!("{prefix}-set-equals"),
            pair(),
            boolean_result(),
            |_, args| {
                let a = bag_arg(args, 0)?;
                let b = bag_arg(args, 1)?;
                Ok(EvaluationValue::boolean(subset(a, b) && subset(b, a)))
            },
        ));
    }
}
