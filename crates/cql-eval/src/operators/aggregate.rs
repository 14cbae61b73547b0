//! Aggregate reductions over a List (spec.md §4.6.5). Each skips nulls;
//! the exact empty/Null-list behavior differs per aggregate.

use cql_ast::{Operator, TemporalPrecision};
use rust_decimal::Decimal;

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::EvalResult;
use crate::value::{Value, ValueKind};

fn non_null_decimals(list: &Value) -> EvalResult<Option<Vec<Decimal>>> {
    if list.is_null() {
        return Ok(None);
    }
    let items = list.to_list()?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_null() {
            out.push(item.to_decimal()?);
        }
    }
    Ok(Some(out))
}

fn count(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::integer(0));
    }
    let items = operands[0].to_list()?;
    Ok(Value::integer(items.iter().filter(|v| !v.is_null()).count() as i32))
}

fn all_true(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::boolean(true));
    }
    let items = operands[0].to_list()?;
    for item in items {
        if let ValueKind::Boolean(false) = item.kind {
            return Ok(Value::boolean(false));
        }
    }
    Ok(Value::boolean(true))
}

fn any_true(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::boolean(false));
    }
    let items = operands[0].to_list()?;
    for item in items {
        if let ValueKind::Boolean(true) = item.kind {
            return Ok(Value::boolean(true));
        }
    }
    Ok(Value::boolean(false))
}

fn sum(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(Value::clamped_decimal(values.into_iter().fold(Decimal::ZERO, |acc, v| acc + v))),
    }
}

fn avg(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) if values.is_empty() => Ok(Value::null()),
        Some(values) => {
            let total: Decimal = values.iter().fold(Decimal::ZERO, |acc, v| acc + v);
            Ok(Value::clamped_decimal(total / Decimal::from(values.len())))
        }
    }
}

fn min(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(values.into_iter().min().map(Value::decimal).unwrap_or_else(Value::null)),
    }
}

fn max(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(values.into_iter().max().map(Value::decimal).unwrap_or_else(Value::null)),
    }
}

fn median(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(mut values) if !values.is_empty() => {
            values.sort();
            let mid = values.len() / 2;
            let result = if values.len() % 2 == 0 { (values[mid - 1] + values[mid]) / Decimal::from(2) } else { values[mid] };
            Ok(Value::clamped_decimal(result))
        }
        _ => Ok(Value::null()),
    }
}

fn geometric_mean(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    use rust_decimal::MathematicalOps;
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) if !values.is_empty() => {
            if values.iter().any(|v| *v <= Decimal::ZERO) {
                return Ok(Value::null());
            }
            let log_sum = values.iter().fold(Some(Decimal::ZERO), |acc, v| Some(acc? + v.checked_ln()?));
            let result = log_sum
                .and_then(|sum| (sum / Decimal::from(values.len())).checked_exp());
            Ok(result.map(Value::clamped_decimal).unwrap_or_else(Value::null))
        }
        _ => Ok(Value::null()),
    }
}

fn variance_like(values: &[Decimal], population: bool) -> Option<Decimal> {
    if values.len() < 2 && !population {
        return None;
    }
    if values.is_empty() {
        return None;
    }
    let n = Decimal::from(values.len());
    let mean = values.iter().fold(Decimal::ZERO, |acc, v| acc + v) / n;
    let sum_sq: Decimal = values.iter().map(|v| (*v - mean) * (*v - mean)).fold(Decimal::ZERO, |acc, v| acc + v);
    let denom = if population { n } else { n - Decimal::ONE };
    if denom.is_zero() {
        return None;
    }
    Some(sum_sq / denom)
}

fn stddev(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    use rust_decimal::MathematicalOps;
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(variance_like(&values, false).and_then(|v| v.sqrt()).map(Value::clamped_decimal).unwrap_or_else(Value::null)),
    }
}

fn variance(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(variance_like(&values, false).map(Value::clamped_decimal).unwrap_or_else(Value::null)),
    }
}

fn population_stddev(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    use rust_decimal::MathematicalOps;
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(variance_like(&values, true).and_then(|v| v.sqrt()).map(Value::clamped_decimal).unwrap_or_else(Value::null)),
    }
}

fn population_variance(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match non_null_decimals(&operands[0])? {
        None => Ok(Value::null()),
        Some(values) => Ok(variance_like(&values, true).map(Value::clamped_decimal).unwrap_or_else(Value::null)),
    }
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    table.register(Operator::Count, &[List], count);
    table.register(Operator::AllTrue, &[List], all_true);
    table.register(Operator::AnyTrue, &[List], any_true);
    table.register(Operator::Sum, &[List], sum);
    table.register(Operator::Avg, &[List], avg);
    table.register(Operator::Min, &[List], min);
    table.register(Operator::Max, &[List], max);
    table.register(Operator::Median, &[List], median);
    table.register(Operator::GeometricMean, &[List], geometric_mean);
    table.register(Operator::StdDev, &[List], stddev);
    table.register(Operator::Variance, &[List], variance);
    table.register(Operator::PopulationStdDev, &[List], population_stddev);
    table.register(Operator::PopulationVariance, &[List], population_variance);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cql_ast::Type;

    fn decimals(values: &[&str]) -> Value {
        Value::list(values.iter().map(|s| Value::decimal(s.parse().unwrap())).collect(), Type::Decimal)
    }

    #[test]
    fn count_skips_nulls_and_treats_null_list_as_zero() {
        let list = Value::list(vec![Value::integer(1), Value::null(), Value::integer(2)], Type::Integer);
        assert_eq!(count(&[list], None).unwrap().to_int32().unwrap(), 2);
        assert_eq!(count(&[Value::null()], None).unwrap().to_int32().unwrap(), 0);
    }

    #[test]
    fn all_true_vacuously_true_on_null_or_empty_list() {
        assert_eq!(all_true(&[Value::null()], None).unwrap().to_bool().unwrap(), true);
        let empty = Value::list(vec![], Type::Boolean);
        assert_eq!(all_true(&[empty], None).unwrap().to_bool().unwrap(), true);
        let mixed = Value::list(vec![Value::boolean(true), Value::boolean(false)], Type::Boolean);
        assert_eq!(all_true(&[mixed], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn any_true_vacuously_false_on_null_list() {
        assert_eq!(any_true(&[Value::null()], None).unwrap().to_bool().unwrap(), false);
        let mixed = Value::list(vec![Value::boolean(false), Value::boolean(true)], Type::Boolean);
        assert_eq!(any_true(&[mixed], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn sum_is_null_on_null_list_but_zero_on_empty_list() {
        assert!(sum(&[Value::null()], None).unwrap().is_null());
        let empty = Value::list(vec![], Type::Decimal);
        assert_eq!(sum(&[empty], None).unwrap().to_decimal().unwrap(), Decimal::ZERO);
        let list = decimals(&["1.5", "2.5"]);
        assert_eq!(sum(&[list], None).unwrap().to_decimal().unwrap(), Decimal::from(4));
    }

    #[test]
    fn avg_is_null_when_list_has_no_non_null_values() {
        let empty = Value::list(vec![], Type::Decimal);
        assert!(avg(&[empty], None).unwrap().is_null());
        let list = decimals(&["2", "4"]);
        assert_eq!(avg(&[list], None).unwrap().to_decimal().unwrap(), Decimal::from(3));
    }

    #[test]
    fn min_and_max_ignore_nulls() {
        let list = Value::list(vec![Value::integer(3), Value::null(), Value::integer(1)], Type::Integer);
        assert_eq!(min(&[list.clone()], None).unwrap().to_decimal().unwrap(), Decimal::from(1));
        assert_eq!(max(&[list], None).unwrap().to_decimal().unwrap(), Decimal::from(3));
    }

    #[test]
    fn median_averages_the_middle_pair_on_even_length() {
        let list = decimals(&["1", "2", "3", "4"]);
        assert_eq!(median(&[list], None).unwrap().to_decimal().unwrap(), "2.5".parse::<Decimal>().unwrap());
    }

    #[test]
    fn geometric_mean_is_null_for_nonpositive_values() {
        let list = decimals(&["1", "-2"]);
        assert!(geometric_mean(&[list], None).unwrap().is_null());
        let list = decimals(&["4", "9"]);
        let result = geometric_mean(&[list], None).unwrap().to_decimal().unwrap();
        assert!((result - Decimal::from(6)).abs() < "0.01".parse().unwrap());
    }

    #[test]
    fn variance_requires_at_least_two_values_population_variance_does_not() {
        let single = decimals(&["5"]);
        assert!(variance(&[single.clone()], None).unwrap().is_null());
        assert!(!population_variance(&[single], None).unwrap().is_null());
        let pair = decimals(&["2", "4"]);
        assert_eq!(variance(&[pair], None).unwrap().to_decimal().unwrap(), Decimal::from(2));
    }
}
