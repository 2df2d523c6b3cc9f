//! Date and dateTime arithmetic with durations.

use basalt_types::{AttributeValue, DataType, TypeError, add_months_to_date_time};

use super::{Arguments, Builtin, FunctionRegistry, Param, XACML_3_0, value_arg};
use crate::value::EvaluationValue;

const DATE: Param = Param::Value(DataType::Date);
const DATE_TIME: Param = Param::Value(DataType::DateTime);
const DAY_TIME: Param = Param::Value(DataType::DayTimeDuration);
const YEAR_MONTH: Param = Param::Value(DataType::YearMonthDuration);

fn out_of_range(name: &str) -> EvaluationValue {
    EvaluationValue::processing_error(format!("{name}: result out of range"))
}

fn register_day_time(registry: &mut FunctionRegistry, name: &'static str, sign: i32) {
    registry.add(Builtin::new(
        format!("{XACML_3_0}{name}"),
        Arguments::fixed([DATE_TIME, DAY_TIME]),
        Some(DATE_TIME),
        move |_, args| match (value_arg(args, 0)?, value_arg(args, 1)?) {
            (AttributeValue::DateTime(at), AttributeValue::DayTimeDuration(duration)) => {
                let shifted = if sign < 0 {
                    at.checked_sub_signed(duration.0)
                } else {
                    at.checked_add_signed(duration.0)
                };
                Ok(shifted.map_or_else(
                    || out_of_range(name),
                    |v| EvaluationValue::Value(AttributeValue::DateTime(v)),
                ))
            }
            (a, b) => Err(TypeError::mismatch(a.data_type(), b.data_type()).into()),
        },
    ));
}

fn register_year_month(
    registry: &mut FunctionRegistry,
    name: &'static str,
    target: DataType,
    sign: i64,
) {
    registry.add(Builtin::new(
        format!("{XACML_3_0}{name}"),
        Arguments::fixed([Param::Value(target), YEAR_MONTH]),
        Some(Param::Value(target)),
        move |_, args| {
            let months = match value_arg(args, 1)? {
                AttributeValue::YearMonthDuration(duration) => duration.months.checked_mul(sign),
                other => {
                    return Err(
                        TypeError::mismatch(DataType::YearMonthDuration, other.data_type()).into(),
                    );
                }
            };
            let Some(months) = months else {
                return Ok(out_of_range(name));
            };
            let shifted = match value_arg(args, 0)? {
                AttributeValue::DateTime(at) => {
                    add_months_to_date_time(*at, months).map(AttributeValue::DateTime)
                }
                AttributeValue::Date(date) => date.add_months(months).map(AttributeValue::Date),
                other => return Err(TypeError::mismatch(target, other.data_type()).into()),
            };
            Ok(shifted.map_or_else(|| out_of_range(name), EvaluationValue::Value))
        },
    ));
}

pub(crate) fn register(registry: &mut FunctionRegistry) {
    register_day_time(registry, "dateTime-add-dayTimeDuration", 1);
    register_day_time(registry, "dateTime-subtract-dayTimeDuration", -1);
    register_year_month(registry, "dateTime-add-yearMonthDuration", DataType::DateTime, 1);
    register_year_month(
        registry,
        "dateTime-subtract-yearMonthDuration",
        DataType::DateTime,
        -1,
    );
    register_year_month(registry, "date-add-yearMonthDuration", DataType::Date, 1);
    register_year_month(registry, "date-subtract-yearMonthDuration", DataType::Date, -1);
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use basalt_types::DataType;
    use test_case::test_case;

    fn f(name: &str) -> String {
        format!("urn:oasis:names:tc:xacml:3.0:function:{name}")
    }

    #[test_case("dateTime-add-dayTimeDuration", "2024-02-28T22:00:00Z", "P1DT3H", "2024-03-01T01:00:00Z")]
    #[test_case("dateTime-subtract-dayTimeDuration", "2024-03-01T00:30:00+02:00", "PT1H", "2024-02-29T23:30:00+02:00")]
    #[test_case("dateTime-add-dayTimeDuration", "2024-01-01T00:00:00Z", "-PT1S", "2023-12-31T23:59:59Z")]
    fn test_day_time_arithmetic(name: &str, at: &str, duration: &str, expected: &str) {
        let result = call(
            &f(name),
            vec![
                parsed(DataType::DateTime, at),
                parsed(DataType::DayTimeDuration, duration),
            ],
        );
        assert_eq!(result, parsed(DataType::DateTime, expected));
    }

    #[test_case("dateTime-add-yearMonthDuration", DataType::DateTime, "2024-01-31T12:00:00Z", "P1M", "2024-02-29T12:00:00Z")]
    #[test_case("dateTime-subtract-yearMonthDuration", DataType::DateTime, "2024-03-31T12:00:00Z", "P1Y1M", "2023-02-28T12:00:00Z")]
    #[test_case("date-add-yearMonthDuration", DataType::Date, "2023-11-30", "P3M", "2024-02-29")]
    #[test_case("date-subtract-yearMonthDuration", DataType::Date, "2024-02-29", "P1Y", "2023-02-28")]
    fn test_year_month_arithmetic(
        name: &str,
        data_type: DataType,
        at: &str,
        duration: &str,
        expected: &str,
    ) {
        let result = call(
            &f(name),
            vec![
                parsed(data_type, at),
                parsed(DataType::YearMonthDuration, duration),
            ],
        );
        assert_eq!(result, parsed(data_type, expected));
    }

    #[test]
    fn test_overflow_is_indeterminate() {
        let result = call(
            &f("date-add-yearMonthDuration"),
            vec![
                parsed(DataType::Date, "2024-01-01"),
                parsed(DataType::YearMonthDuration, "P999999999Y"),
            ],
        );
        assert!(is_processing_error(&result), "{result:?}");
    }
}
