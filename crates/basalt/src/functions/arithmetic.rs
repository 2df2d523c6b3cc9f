//! Integer and double arithmetic.
//!
//! Overflow, division by zero and unrepresentable conversions produce
//! Indeterminate (processing-error) rather than wrapping or panicking.

use basalt_types::{AttributeValue, DataType};

use super::{Arguments, Builtin, FunctionRegistry, Param, XACML_1_0, double_arg, integer_arg};
use crate::error::Result;
use crate::value::EvaluationValue;

const INTEGER: Param = Param::Value(DataType::Integer);
const DOUBLE: Param = Param::Value(DataType::Double);

fn integer(value: Option<i64>, operation: &str) -> EvaluationValue {
    match value {
        Some(v) => EvaluationValue::Value(AttributeValue::Integer(v)),
        None => EvaluationValue::processing_error(format!("integer {operation} out of range")),
    }
}

fn double(value: f64) -> EvaluationValue {
    EvaluationValue::Value(AttributeValue::Double(value))
}

fn integers(args: &[EvaluationValue]) -> Result<Vec<i64>> {
    (0..args.len()).map(|i| integer_arg(args, i)).collect()
}

fn doubles(args: &[EvaluationValue]) -> Result<Vec<f64>> {
    (0..args.len()).map(|i| double_arg(args, i)).collect()
}

/// XPath `fn:round`: halves round towards positive infinity.
fn round_half_up(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    let id = |name: &str| format!("{XACML_1_0}{name}");

    // Integer
    registry.add(Builtin::new(
        id("integer-add"),
        Arguments::variadic(INTEGER, 2),
        Some(INTEGER),
        |_, args| {
            let sum = integers(args)?
                .into_iter()
                .try_fold(0_i64, i64::checked_add);
            Ok(integer(sum, "addition"))
        },
    ));
    registry.add(Builtin::new(
        id("integer-multiply"),
        Arguments::variadic(INTEGER, 2),
        Some(INTEGER),
        |_, args| {
            let product = integers(args)?
                .into_iter()
                .try_fold(1_i64, i64::checked_mul);
            Ok(integer(product, "multiplication"))
        },
    ));
    registry.add(Builtin::new(
        id("integer-subtract"),
        Arguments::fixed([INTEGER, INTEGER]),
        Some(INTEGER),
        |_, args| {
            let a = integer_arg(args, 0)?;
            let b = integer_arg(args, 1)?;
            Ok(integer(a.checked_sub(b), "subtraction"))
        },
    ));
    registry.add(Builtin::new(
        id("integer-divide"),
        Arguments::fixed([INTEGER, INTEGER]),
        Some(INTEGER),
        |_, args| {
            let a = integer_arg(args, 0)?;
            let b = integer_arg(args, 1)?;
            if b == 0 {
                return Ok(EvaluationValue::processing_error("division by zero"));
            }
            Ok(integer(a.checked_div(b), "division"))
        },
    ));
    registry.add(Builtin::new(
        id("integer-mod"),
        Arguments::fixed([INTEGER, INTEGER]),
        Some(INTEGER),
        |_, args| {
            let a = integer_arg(args, 0)?;
            let b = integer_arg(args, 1)?;
            if b == 0 {
                return Ok(EvaluationValue::processing_error("division by zero"));
            }
            Ok(integer(a.checked_rem(b), "remainder"))
        },
    ));
    registry.add(Builtin::new(
        id("integer-abs"),
        Arguments::fixed([INTEGER]),
        Some(INTEGER),
        |_, args| Ok(integer(integer_arg(args, 0)?.checked_abs(), "absolute value")),
    ));
    registry.add(Builtin::new(
        id("integer-to-double"),
        Arguments::fixed([INTEGER]),
        Some(DOUBLE),
        |_, args| Ok(double(integer_arg(args, 0)? as f64)),
    ));

    // Double
    registry.add(Builtin::new(
        id("double-add"),
        Arguments::variadic(DOUBLE, 2),
        Some(DOUBLE),
        |_, args| Ok(double(doubles(args)?.into_iter().sum())),
    ));
    registry.add(Builtin::new(
        id("double-multiply"),
        Arguments::variadic(DOUBLE, 2),
        Some(DOUBLE),
        |_, args| Ok(double(doubles(args)?.into_iter().product())),
    ));
    registry.add(Builtin::new(
        id("double-subtract"),
        Arguments::fixed([DOUBLE, DOUBLE]),
        Some(DOUBLE),
        |_, args| Ok(double(double_arg(args, 0)? - double_arg(args, 1)?)),
    ));
    registry.add(Builtin::new(
        id("double-divide"),
        Arguments::fixed([DOUBLE, DOUBLE]),
        Some(DOUBLE),
        |_, args| {
            let a = double_arg(args, 0)?;
            let b = double_arg(args, 1)?;
            if b == 0.0 {
                return Ok(EvaluationValue::processing_error("division by zero"));
            }
            Ok(double(a / b))
        },
    ));
    registry.add(Builtin::new(
        id("double-abs"),
        Arguments::fixed([DOUBLE]),
        Some(DOUBLE),
        |_, args| Ok(double(double_arg(args, 0)?.abs())),
    ));
    registry.add(Builtin::new(
        id("round"),
        Arguments::fixed([DOUBLE]),
        Some(DOUBLE),
        |_, args| Ok(double(round_half_up(double_arg(args, 0)?))),
    ));
    registry.add(Builtin::new(
        id("floor"),
        Arguments::fixed([DOUBLE]),
        Some(DOUBLE),
        |_, args| Ok(double(double_arg(args, 0)?.floor())),
    ));
    registry.add(Builtin::new(
        id("double-to-integer"),
        Arguments::fixed([DOUBLE]),
        Some(INTEGER),
        |_, args| {
            let x = double_arg(args, 0)?.trunc();
            // i64::MAX is not representable; 2^63 is the first value out of range.
            let limit = 9_223_372_036_854_775_808.0_f64;
            if x.is_nan() || x >= limit || x < -limit {
                return Ok(EvaluationValue::processing_error(format!(
                    "{x} cannot be converted to an integer"
                )));
            }
            Ok(integer(Some(x as i64), "conversion"))
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::round_half_up;
    use crate::value::EvaluationValue;
    use test_case::test_case;

    fn f(name: &str) -> String {
        format!("urn:oasis:names:tc:xacml:1.0:function:{name}")
    }

    #[test]
    fn test_variadic_integer_arithmetic() {
        assert_eq!(call(&f("integer-add"), vec![int(1), int(2), int(3)]), int(6));
        assert_eq!(call(&f("integer-multiply"), vec![int(2), int(3), int(4)]), int(24));
        assert_eq!(call(&f("integer-subtract"), vec![int(2), int(5)]), int(-3));
        assert_eq!(call(&f("integer-divide"), vec![int(-7), int(2)]), int(-3));
        assert_eq!(call(&f("integer-mod"), vec![int(7), int(3)]), int(1));
        assert_eq!(call(&f("integer-abs"), vec![int(-4)]), int(4));
    }

    #[test_case("integer-add", vec![i64::MAX, 1]; "add overflow")]
    #[test_case("integer-multiply", vec![i64::MAX, 2]; "multiply overflow")]
    #[test_case("integer-subtract", vec![i64::MIN, 1]; "subtract overflow")]
    #[test_case("integer-divide", vec![1, 0]; "divide by zero")]
    #[test_case("integer-divide", vec![i64::MIN, -1]; "divide overflow")]
    #[test_case("integer-mod", vec![1, 0]; "mod by zero")]
    #[test_case("integer-abs", vec![i64::MIN]; "abs overflow")]
    fn test_integer_errors_are_indeterminate(name: &str, operands: Vec<i64>) {
        let args = operands.into_iter().map(int).collect();
        let result = call(&f(name), args);
        assert!(is_processing_error(&result), "{name}: {result:?}");
    }

    #[test]
    fn test_double_arithmetic() {
        assert_eq!(call(&f("double-add"), vec![dbl(1.5), dbl(2.25)]), dbl(3.75));
        assert_eq!(call(&f("double-multiply"), vec![dbl(1.5), dbl(2.0)]), dbl(3.0));
        assert_eq!(call(&f("double-subtract"), vec![dbl(1.5), dbl(2.0)]), dbl(-0.5));
        assert_eq!(call(&f("double-divide"), vec![dbl(1.0), dbl(4.0)]), dbl(0.25));
        assert!(is_processing_error(&call(
            &f("double-divide"),
            vec![dbl(1.0), dbl(0.0)]
        )));
        assert_eq!(call(&f("double-abs"), vec![dbl(-2.5)]), dbl(2.5));
        assert_eq!(call(&f("floor"), vec![dbl(-2.5)]), dbl(-3.0));
    }

    #[test_case(2.5, 3.0)]
    #[test_case(-2.5, -2.0)]
    #[test_case(2.4, 2.0)]
    #[test_case(-0.2, 0.0)]
    fn test_round_half_up(x: f64, expected: f64) {
        assert!((round_half_up(x) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call(&f("integer-to-double"), vec![int(3)]), dbl(3.0));
        assert_eq!(call(&f("double-to-integer"), vec![dbl(-3.9)]), int(-3));
        assert!(is_processing_error(&call(
            &f("double-to-integer"),
            vec![dbl(f64::NAN)]
        )));
        assert!(is_processing_error(&call(
            &f("double-to-integer"),
            vec![dbl(1e19)]
        )));
    }

    #[test]
    fn test_missing_operands_are_rejected_before_dispatch() {
        let registry = crate::functions::FunctionRegistry::with_builtins();
        let add = registry.resolve(&f("integer-add")).expect("registered");
        assert!(add.arguments().check_arity(add.id(), 1).is_err());
        assert!(matches!(
            call(&f("integer-add"), vec![int(1), v("2")]),
            EvaluationValue::Indeterminate(_)
        ));
    }
}
