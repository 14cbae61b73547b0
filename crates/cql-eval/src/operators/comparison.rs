//! Equality, ordering, and precision-aware temporal comparison
//! (spec.md §4.6.4).

use cql_ast::{Operator, TemporalPrecision};

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::{EvalError, EvalResult};
use crate::temporal::PrecisionComparison;
use crate::value::{Value, ValueKind};

fn equal(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(operands[0].equal(&operands[1]))
}

fn not_equal(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(match operands[0].equal(&operands[1]).kind {
        ValueKind::Boolean(b) => Value::boolean(!b),
        _ => Value::null(),
    })
}

fn equivalent(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(operands[0].equivalent(&operands[1]))
}

fn not_equivalent(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    match operands[0].equivalent(&operands[1]).kind {
        ValueKind::Boolean(b) => Ok(Value::boolean(!b)),
        _ => Err(EvalError::Internal("Equivalent must be total".into())),
    }
}

fn numeric_order(operands: &[Value], want: std::cmp::Ordering, or_equal: bool) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let ordering = match (&operands[0].kind, &operands[1].kind) {
        (ValueKind::String(a), ValueKind::String(b)) => a.cmp(b),
        _ => {
            let a = operands[0].to_decimal()?;
            let b = operands[1].to_decimal()?;
            a.cmp(&b)
        }
    };
    Ok(Value::boolean(ordering == want || (or_equal && ordering == std::cmp::Ordering::Equal)))
}

fn less(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    numeric_order(operands, std::cmp::Ordering::Less, false)
}
fn greater(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    numeric_order(operands, std::cmp::Ordering::Greater, false)
}
fn less_or_equal(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    numeric_order(operands, std::cmp::Ordering::Less, true)
}
fn greater_or_equal(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    numeric_order(operands, std::cmp::Ordering::Greater, true)
}

macro_rules! temporal_cmp {
    ($name:ident, $method:ident) => {
        fn $name(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
            if operands[0].is_null() || operands[1].is_null() {
                return Ok(Value::null());
            }
            let result: PrecisionComparison = match (&operands[0].kind, &operands[1].kind) {
                (ValueKind::Date(a), ValueKind::Date(b)) => {
                    let eff = precision.unwrap_or_else(|| a.precision.min(b.precision));
                    a.compare_at_precision(b, eff)
                }
                (ValueKind::DateTime(a), ValueKind::DateTime(b)) => {
                    let eff = precision.unwrap_or_else(|| a.precision.min(b.precision));
                    a.compare_at_precision(b, eff)
                }
                (ValueKind::Time(a), ValueKind::Time(b)) => {
                    let eff = precision.unwrap_or_else(|| a.precision.min(b.precision));
                    a.compare_at_precision(b, eff)
                }
                _ => return Err(EvalError::Internal("temporal comparison on non-temporal operands".into())),
            };
            Ok(result.$method())
        }
    };
}

temporal_cmp!(before, to_before_value);
temporal_cmp!(after, to_after_value);
temporal_cmp!(same_as, to_equal_value);

fn same_or_before(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    let b = before(operands, precision)?;
    let eq = same_as(operands, precision)?;
    Ok(or_bool(&b, &eq))
}

fn same_or_after(operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    let a = after(operands, precision)?;
    let eq = same_as(operands, precision)?;
    Ok(or_bool(&a, &eq))
}

fn or_bool(a: &Value, b: &Value) -> Value {
    match (&a.kind, &b.kind) {
        (ValueKind::Boolean(true), _) | (_, ValueKind::Boolean(true)) => Value::boolean(true),
        (ValueKind::Boolean(false), ValueKind::Boolean(false)) => Value::boolean(false),
        _ => Value::null(),
    }
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    for tags in [
        [Boolean, Boolean],
        [Integer, Integer],
        [Long, Long],
        [Decimal, Decimal],
        [String, String],
        [Quantity, Quantity],
        [Date, Date],
        [DateTime, DateTime],
        [Time, Time],
        [Code, Code],
        [Interval, Interval],
        [List, List],
        [Tuple, Tuple],
    ] {
        table.register(Operator::Equal, &tags, equal);
        table.register(Operator::NotEqual, &tags, not_equal);
        table.register(Operator::Equivalent, &tags, equivalent);
        table.register(Operator::NotEquivalent, &tags, not_equivalent);
    }
    for tags in [[Integer, Integer], [Long, Long], [Decimal, Decimal], [String, String]] {
        table.register(Operator::Less, &tags, less);
        table.register(Operator::Greater, &tags, greater);
        table.register(Operator::LessOrEqual, &tags, less_or_equal);
        table.register(Operator::GreaterOrEqual, &tags, greater_or_equal);
    }
    for tags in [[Date, Date], [DateTime, DateTime], [Time, Time]] {
        table.register(Operator::Before, &tags, before);
        table.register(Operator::After, &tags, after);
        table.register(Operator::SameAs, &tags, same_as);
        table.register(Operator::SameOrBefore, &tags, same_or_before);
        table.register(Operator::SameOrAfter, &tags, same_or_after);
        table.register(Operator::Less, &tags, before);
        table.register(Operator::Greater, &tags, after);
        table.register(Operator::LessOrEqual, &tags, same_or_before);
        table.register(Operator::GreaterOrEqual, &tags, same_or_after);
    }
}
