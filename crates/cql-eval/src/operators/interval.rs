//! Interval membership, containment, and set operators (spec.md §4.6.6).

use std::cmp::Ordering;

use cql_ast::{Operator, TemporalPrecision, Type};

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

fn interval_parts(v: &Value) -> EvalResult<(&Value, &Value, bool, bool)> {
    match &v.kind {
        ValueKind::Interval { low, high, low_inclusive, high_inclusive } => Ok((low, high, *low_inclusive, *high_inclusive)),
        _ => Err(EvalError::TypeMismatch(format!("expected Interval, found {}", v.type_name()))),
    }
}

fn make_interval(low: Value, high: Value, low_inclusive: bool, high_inclusive: bool) -> Value {
    Value { kind: ValueKind::Interval { low: Box::new(low), high: Box::new(high), low_inclusive, high_inclusive }, provenance: None }
}

/// `None` means the comparison could not be made (a Null endpoint, or
/// insufficient shared temporal precision) and the caller should treat
/// the overall result as unbounded or Null depending on context.
fn point_cmp(a: &Value, b: &Value, precision: Option<TemporalPrecision>) -> EvalResult<Option<Ordering>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    use crate::temporal::PrecisionComparison;
    let from_precision = |pc: PrecisionComparison| match pc {
        PrecisionComparison::LeftBeforeRight => Some(Ordering::Less),
        PrecisionComparison::LeftEqualRight => Some(Ordering::Equal),
        PrecisionComparison::LeftAfterRight => Some(Ordering::Greater),
        PrecisionComparison::InsufficientPrecision => None,
    };
    match (&a.kind, &b.kind) {
        (ValueKind::String(x), ValueKind::String(y)) => Ok(Some(x.cmp(y))),
        (ValueKind::Date(x), ValueKind::Date(y)) => {
            validate_precision_date(precision)?;
            let eff = precision.unwrap_or_else(|| x.precision.min(y.precision));
            Ok(from_precision(x.compare_at_precision(y, eff)))
        }
        (ValueKind::DateTime(x), ValueKind::DateTime(y)) => {
            validate_precision_datetime(precision)?;
            let eff = precision.unwrap_or_else(|| x.precision.min(y.precision));
            Ok(from_precision(x.compare_at_precision(y, eff)))
        }
        (ValueKind::Time(x), ValueKind::Time(y)) => {
            validate_precision_time(precision)?;
            let eff = precision.unwrap_or_else(|| x.precision.min(y.precision));
            Ok(from_precision(x.compare_at_precision(y, eff)))
        }
        _ => Ok(Some(a.to_decimal()?.cmp(&b.to_decimal()?))),
    }
}

fn validate_precision_date(precision: Option<TemporalPrecision>) -> EvalResult<()> {
    if let Some(p) = precision {
        if !matches!(p, TemporalPrecision::Year | TemporalPrecision::Month | TemporalPrecision::Day) {
            return Err(EvalError::InvalidPrecision("precision must be one of Year, Month, Day".into()));
        }
    }
    Ok(())
}

fn validate_precision_datetime(precision: Option<TemporalPrecision>) -> EvalResult<()> {
    if let Some(p) = precision {
        if p == TemporalPrecision::Week {
            return Err(EvalError::InvalidPrecision(
                "precision must be one of Year, Month, Day, Hour, Minute, Second, Millisecond".into(),
            ));
        }
    }
    Ok(())
}

fn validate_precision_time(precision: Option<TemporalPrecision>) -> EvalResult<()> {
    if let Some(p) = precision {
        if !matches!(
            p,
            TemporalPrecision::Hour | TemporalPrecision::Minute | TemporalPrecision::Second | TemporalPrecision::Millisecond
        ) {
            return Err(EvalError::InvalidPrecision("precision must be one of Hour, Minute, Second, Millisecond".into()));
        }
    }
    Ok(())
}

/// `point` against a `low`/`high` boundary pair, respecting open/closed
/// ends. An unbounded (Null) end always satisfies its side.
fn within_bounds(point: &Value, low: &Value, high: &Value, low_inclusive: bool, high_inclusive: bool, precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    let low_ok = if low.is_null() {
        Some(true)
    } else {
        match point_cmp(point, low, precision)? {
            None => None,
            Some(Ordering::Less) => Some(false),
            Some(Ordering::Equal) => Some(low_inclusive),
            Some(Ordering::Greater) => Some(true),
        }
    };
    let high_ok = if high.is_null() {
        Some(true)
    } else {
        match point_cmp(point, high, precision)? {
            None => None,
            Some(Ordering::Greater) => Some(false),
            Some(Ordering::Equal) => Some(high_inclusive),
            Some(Ordering::Less) => Some(true),
        }
    };
    match (low_ok, high_ok) {
        (Some(false), _) | (_, Some(false)) => Ok(Value::boolean(false)),
        (Some(true), Some(true)) => Ok(Value::boolean(true)),
        _ => Ok(Value::null()),
    }
}

fn in_interval(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (low, high, li, hi) = interval_parts(&operands[1])?;
    within_bounds(&operands[0], low, high, li, hi, precision)
}

fn contains(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (low, high, li, hi) = interval_parts(&operands[0])?;
    within_bounds(&operands[1], low, high, li, hi, precision)
}

fn overlaps(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a_low, a_high, _, _) = interval_parts(&operands[0])?;
    let (b_low, b_high, _, _) = interval_parts(&operands[1])?;
    let a_before_b = matches!(point_cmp(a_high, b_low, precision)?, Some(Ordering::Less));
    let b_before_a = matches!(point_cmp(b_high, a_low, precision)?, Some(Ordering::Less));
    Ok(Value::boolean(!a_before_b && !b_before_a))
}

fn starts(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a_low, a_high, ali, _) = interval_parts(&operands[0])?;
    let (b_low, b_high, bli, _) = interval_parts(&operands[1])?;
    let low_eq = matches!(point_cmp(a_low, b_low, precision)?, Some(Ordering::Equal)) && ali == bli;
    let high_le = !matches!(point_cmp(a_high, b_high, precision)?, Some(Ordering::Greater));
    Ok(Value::boolean(low_eq && high_le))
}

fn ends(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a_low, a_high, _, ahi) = interval_parts(&operands[0])?;
    let (b_low, b_high, _, bhi) = interval_parts(&operands[1])?;
    let high_eq = matches!(point_cmp(a_high, b_high, precision)?, Some(Ordering::Equal)) && ahi == bhi;
    let low_ge = !matches!(point_cmp(a_low, b_low, precision)?, Some(Ordering::Less));
    Ok(Value::boolean(high_eq && low_ge))
}

fn during(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    contains(&[operands[1].clone(), operands[0].clone()], precision)
}

fn union(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let overlap = overlaps(operands, precision)?;
    if !matches!(overlap.kind, ValueKind::Boolean(true)) {
        return Ok(Value::null());
    }
    let (a_low, a_high, ali, ahi) = interval_parts(&operands[0])?;
    let (b_low, b_high, bli, bhi) = interval_parts(&operands[1])?;
    let (low, low_inclusive) = match point_cmp(a_low, b_low, precision)? {
        Some(Ordering::Greater) => (b_low.clone(), bli),
        Some(Ordering::Less) => (a_low.clone(), ali),
        _ => (a_low.clone(), ali || bli),
    };
    let (high, high_inclusive) = match point_cmp(a_high, b_high, precision)? {
        Some(Ordering::Less) => (b_high.clone(), bhi),
        Some(Ordering::Greater) => (a_high.clone(), ahi),
        _ => (a_high.clone(), ahi || bhi),
    };
    Ok(make_interval(low, high, low_inclusive, high_inclusive))
}

fn intersect(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a_low, a_high, ali, ahi) = interval_parts(&operands[0])?;
    let (b_low, b_high, bli, bhi) = interval_parts(&operands[1])?;
    let (low, low_inclusive) = match point_cmp(a_low, b_low, precision)? {
        Some(Ordering::Less) => (b_low.clone(), bli),
        Some(Ordering::Greater) => (a_low.clone(), ali),
        _ => (a_low.clone(), ali && bli),
    };
    let (high, high_inclusive) = match point_cmp(a_high, b_high, precision)? {
        Some(Ordering::Greater) => (b_high.clone(), bhi),
        Some(Ordering::Less) => (a_high.clone(), ahi),
        _ => (a_high.clone(), ahi && bhi),
    };
    if matches!(point_cmp(&low, &high, precision)?, Some(Ordering::Greater)) {
        return Ok(Value::null());
    }
    Ok(make_interval(low, high, low_inclusive, high_inclusive))
}

fn except(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let overlap = overlaps(operands, precision)?;
    if !matches!(overlap.kind, ValueKind::Boolean(true)) {
        return Ok(operands[0].clone());
    }
    let (a_low, a_high, ali, ahi) = interval_parts(&operands[0])?;
    let (b_low, b_high, bli, bhi) = interval_parts(&operands[1])?;
    let b_covers_a_low = !matches!(point_cmp(b_low, a_low, precision)?, Some(Ordering::Greater));
    let b_covers_a_high = !matches!(point_cmp(b_high, a_high, precision)?, Some(Ordering::Less));
    if b_covers_a_low && b_covers_a_high {
        return Ok(Value::null());
    }
    if b_covers_a_low {
        return Ok(make_interval(b_high.clone(), a_high.clone(), !bhi, ahi));
    }
    if b_covers_a_high {
        return Ok(make_interval(a_low.clone(), b_low.clone(), ali, !bli));
    }
    Ok(Value::null())
}

fn unit_step(element_type: &Type) -> Value {
    match element_type {
        Type::Integer => Value::integer(1),
        Type::Long => Value::long(1),
        _ => Value::decimal(rust_decimal::Decimal::new(1, 8)),
    }
}

fn step_value(v: &Value, step: &Value) -> EvalResult<Value> {
    match (&v.kind, &step.kind) {
        (ValueKind::Integer(a), ValueKind::Integer(b)) => Ok(Value::integer(a + b)),
        (ValueKind::Long(a), ValueKind::Long(b)) => Ok(Value::long(a + b)),
        (ValueKind::Decimal(a), ValueKind::Decimal(b)) => Ok(Value::decimal(a + b)),
        _ => Err(EvalError::Internal("Expand step on unsupported point type".into())),
    }
}

fn expand(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let (low, high, li, hi) = interval_parts(&operands[0])?;
    if low.is_null() || high.is_null() {
        return Err(EvalError::DomainError("Expand requires a bounded interval".into()));
    }
    let element_type = low.runtime_type();
    let step = unit_step(&element_type);
    let mut items = Vec::new();
    let mut current = if li { low.clone() } else { step_value(low, &step)? };
    let mut guard = 0;
    loop {
        guard += 1;
        if guard > 1_000_000 {
            return Err(EvalError::DomainError("Expand produced too many points".into()));
        }
        let past_high = if hi {
            matches!(point_cmp(&current, high, None)?, Some(Ordering::Greater))
        } else {
            !matches!(point_cmp(&current, high, None)?, Some(Ordering::Less))
        };
        if past_high {
            break;
        }
        items.push(current.clone());
        current = step_value(&current, &step)?;
    }
    Ok(Value::list(items, element_type))
}

fn collapse(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let element_type = match &operands[0].kind {
        ValueKind::List { element_type, .. } => element_type.clone(),
        _ => unreachable!(),
    };
    let mut intervals: Vec<(Value, Value, bool, bool)> = Vec::new();
    for item in items {
        if item.is_null() {
            continue;
        }
        let (low, high, li, hi) = interval_parts(item)?;
        intervals.push((low.clone(), high.clone(), li, hi));
    }
    intervals.sort_by(|a, b| point_cmp(&a.0, &b.0, precision).ok().flatten().unwrap_or(Ordering::Equal));
    let mut merged: Vec<(Value, Value, bool, bool)> = Vec::new();
    for (low, high, li, hi) in intervals {
        if let Some(last) = merged.last_mut() {
            let adjacent_or_overlapping = !matches!(point_cmp(&low, &last.1, precision)?, Some(Ordering::Greater));
            if adjacent_or_overlapping {
                if matches!(point_cmp(&high, &last.1, precision)?, Some(Ordering::Greater)) {
                    last.1 = high;
                    last.3 = hi;
                }
                continue;
            }
        }
        merged.push((low, high, li, hi));
    }
    let result = merged.into_iter().map(|(low, high, li, hi)| make_interval(low, high, li, hi)).collect();
    Ok(Value::list(result, element_type))
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    table.register(Operator::In, &[Null, Interval], in_interval);
    table.register(Operator::Contains, &[Interval, Null], contains);
    table.register(Operator::Overlaps, &[Interval, Interval], overlaps);
    table.register(Operator::Starts, &[Interval, Interval], starts);
    table.register(Operator::Ends, &[Interval, Interval], ends);
    table.register(Operator::During, &[Null, Interval], during);
    table.register(Operator::Union, &[Interval, Interval], union);
    table.register(Operator::Intersect, &[Interval, Interval], intersect);
    table.register(Operator::Except, &[Interval, Interval], except);
    table.register(Operator::Expand, &[Interval], expand);
    table.register(Operator::Collapse, &[List], collapse);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_interval(low: i32, high: i32, li: bool, hi: bool) -> Value {
        make_interval(Value::integer(low), Value::integer(high), li, hi)
    }

    #[test]
    fn in_interval_respects_open_and_closed_bounds() {
        let iv = int_interval(1, 10, true, false);
        assert_eq!(in_interval(&[Value::integer(1), iv.clone()], None).unwrap().to_bool().unwrap(), true);
        assert_eq!(in_interval(&[Value::integer(10), iv.clone()], None).unwrap().to_bool().unwrap(), false);
        assert_eq!(in_interval(&[Value::integer(5), iv], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn in_interval_is_null_when_point_is_null() {
        let iv = int_interval(1, 10, true, true);
        assert!(in_interval(&[Value::null(), iv], None).unwrap().is_null());
    }

    #[test]
    fn contains_is_symmetric_with_in() {
        let iv = int_interval(1, 10, true, true);
        assert_eq!(contains(&[iv, Value::integer(5)], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn overlaps_detects_disjoint_and_touching_intervals() {
        let a = int_interval(1, 5, true, true);
        let b = int_interval(6, 10, true, true);
        assert_eq!(overlaps(&[a.clone(), b.clone()], None).unwrap().to_bool().unwrap(), false);
        let c = int_interval(5, 10, true, true);
        assert_eq!(overlaps(&[a, c], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn starts_requires_equal_low_bound_and_inclusivity() {
        let a = int_interval(1, 5, true, true);
        let b = int_interval(1, 10, true, true);
        assert_eq!(starts(&[a, b], None).unwrap().to_bool().unwrap(), true);
        let c = int_interval(2, 5, true, true);
        let d = int_interval(1, 10, true, true);
        assert_eq!(starts(&[c, d], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn union_merges_overlapping_intervals_and_is_null_when_disjoint() {
        let a = int_interval(1, 5, true, true);
        let b = int_interval(4, 10, true, true);
        let result = union(&[a, b], None).unwrap();
        let (low, high, _, _) = interval_parts(&result).unwrap();
        assert_eq!(low.to_int32().unwrap(), 1);
        assert_eq!(high.to_int32().unwrap(), 10);

        let c = int_interval(1, 2, true, true);
        let d = int_interval(5, 6, true, true);
        assert!(union(&[c, d], None).unwrap().is_null());
    }

    #[test]
    fn intersect_returns_overlap_or_null() {
        let a = int_interval(1, 5, true, true);
        let b = int_interval(3, 10, true, true);
        let result = intersect(&[a, b], None).unwrap();
        let (low, high, _, _) = interval_parts(&result).unwrap();
        assert_eq!(low.to_int32().unwrap(), 3);
        assert_eq!(high.to_int32().unwrap(), 5);

        let c = int_interval(1, 2, true, true);
        let d = int_interval(5, 6, true, true);
        assert!(intersect(&[c, d], None).unwrap().is_null());
    }

    #[test]
    fn except_removes_the_overlapping_portion() {
        let a = int_interval(1, 10, true, true);
        let b = int_interval(5, 20, true, true);
        let result = except(&[a, b], None).unwrap();
        let (low, high, li, hi) = interval_parts(&result).unwrap();
        assert_eq!(low.to_int32().unwrap(), 1);
        assert_eq!(high.to_int32().unwrap(), 5);
        assert_eq!(li, true);
        assert_eq!(hi, false);
    }

    #[test]
    fn expand_enumerates_integer_points_inclusive_of_bounds() {
        let iv = int_interval(1, 3, true, true);
        let result = expand(&[iv], None).unwrap();
        let items = result.to_list().unwrap();
        let values: Vec<i32> = items.iter().map(|v| v.to_int32().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn collapse_merges_adjacent_and_overlapping_intervals() {
        let list = Value::list(
            vec![int_interval(1, 3, true, true), int_interval(3, 5, true, true), int_interval(10, 12, true, true)],
            Type::Interval(Box::new(Type::Integer)),
        );
        let result = collapse(&[list], None).unwrap();
        let items = result.to_list().unwrap();
        assert_eq!(items.len(), 2);
        let (low, high, _, _) = interval_parts(&items[0]).unwrap();
        assert_eq!(low.to_int32().unwrap(), 1);
        assert_eq!(high.to_int32().unwrap(), 5);
    }
}
