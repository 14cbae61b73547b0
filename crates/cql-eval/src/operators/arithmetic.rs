//! Numeric arithmetic over Integer/Long/Decimal, plus the unary numeric
//! operators (spec.md §4.6.2).

use cql_ast::{Operator, TemporalPrecision};
use num_bigint::BigInt;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::{EvalError, EvalResult};
use crate::temporal::{decimal_precision_from_text, digit_count};
use crate::value::{Value, ValueKind};

macro_rules! propagate_null {
    ($operands:expr) => {
        if $operands.iter().any(|v| v.is_null()) {
            return Ok(Value::null());
        }
    };
}

fn add(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    numeric_binop(&operands[0], &operands[1], |a, b| a.checked_add(b), |a, b| a.checked_add(b), |a, b| Some(a + b))
}

fn subtract(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    numeric_binop(&operands[0], &operands[1], |a, b| a.checked_sub(b), |a, b| a.checked_sub(b), |a, b| Some(a - b))
}

fn multiply(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    numeric_binop(&operands[0], &operands[1], |a, b| a.checked_mul(b), |a, b| a.checked_mul(b), |a, b| Some(a * b))
}

fn divide(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let a = operands[0].to_decimal()?;
    let b = operands[1].to_decimal()?;
    if b.is_zero() {
        return Ok(Value::null());
    }
    Ok(Value::clamped_decimal(a / b))
}

fn truncated_divide(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    numeric_binop(
        &operands[0],
        &operands[1],
        |a, b| if b == 0 { None } else { Some(a.wrapping_div(b)) },
        |a, b| if b == 0 { None } else { Some(a.wrapping_div(b)) },
        |a, b| if b.is_zero() { None } else { Some((a / b).trunc()) },
    )
}

fn modulo(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    numeric_binop(
        &operands[0],
        &operands[1],
        |a, b| if b == 0 { None } else { Some(a.wrapping_rem(b)) },
        |a, b| if b == 0 { None } else { Some(a.wrapping_rem(b)) },
        |a, b| if b.is_zero() { None } else { Some(a % b) },
    )
}

fn numeric_binop(
    a: &Value,
    b: &Value,
    int_op: impl Fn(i32, i32) -> Option<i32>,
    long_op: impl Fn(i64, i64) -> Option<i64>,
    dec_op: impl Fn(Decimal, Decimal) -> Option<Decimal>,
) -> EvalResult<Value> {
    match (&a.kind, &b.kind) {
        (ValueKind::Integer(x), ValueKind::Integer(y)) => Ok(int_op(*x, *y).map(Value::integer).unwrap_or_else(Value::null)),
        (ValueKind::Long(x), ValueKind::Long(y)) => Ok(long_op(*x, *y).map(Value::long).unwrap_or_else(Value::null)),
        (ValueKind::Integer(x), ValueKind::Long(y)) | (ValueKind::Long(y), ValueKind::Integer(x)) => {
            Ok(long_op(*x as i64, *y).map(Value::long).unwrap_or_else(Value::null))
        }
        (ValueKind::Decimal(_), _) | (_, ValueKind::Decimal(_)) => {
            let x = a.to_decimal()?;
            let y = b.to_decimal()?;
            Ok(dec_op(x, y).map(Value::clamped_decimal).unwrap_or_else(Value::null))
        }
        _ => Err(EvalError::Internal("numeric_binop called with non-numeric operands".into())),
    }
}

fn power(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    match (&operands[0].kind, &operands[1].kind) {
        (ValueKind::Integer(base), ValueKind::Integer(exp)) => Ok(big_power(*base as i64, *exp)),
        (ValueKind::Long(base), ValueKind::Integer(exp)) => Ok(big_power(*base, *exp)),
        _ => {
            let base = operands[0].to_decimal()?;
            let exp = operands[1].to_decimal()?;
            match base.checked_powd(exp) {
                Some(result) => Ok(Value::clamped_decimal(result)),
                None => Ok(Value::null()),
            }
        }
    }
}

/// Exact big-integer exponentiation, narrowing back only at the end. A
/// negative exponent always returns a Decimal (spec.md §4.6.2, §9).
fn big_power(base: i64, exp: i32) -> Value {
    if exp < 0 {
        let positive = big_power_unsigned(base, (-exp) as u32);
        return match positive.to_f64() {
            Some(denominator) if denominator != 0.0 => {
                Decimal::from_f64_retain(1.0 / denominator).map(Value::clamped_decimal).unwrap_or_else(Value::null)
            }
            _ => Value::null(),
        };
    }
    let result = big_power_unsigned(base, exp as u32);
    match result.to_i64() {
        Some(narrow) if i32::try_from(narrow).is_ok() => Value::integer(narrow as i32),
        Some(narrow) => Value::long(narrow),
        None => Value::null(),
    }
}

fn big_power_unsigned(base: i64, exp: u32) -> BigInt {
    BigInt::from(base).pow(exp)
}

fn abs(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    Ok(match &operands[0].kind {
        ValueKind::Integer(i) => i.checked_abs().map(Value::integer).unwrap_or_else(Value::null),
        ValueKind::Long(i) => i.checked_abs().map(Value::long).unwrap_or_else(Value::null),
        ValueKind::Decimal(d) => Value::clamped_decimal(d.abs()),
        _ => return Err(EvalError::Internal("abs on non-numeric".into())),
    })
}

fn negate(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    Ok(match &operands[0].kind {
        ValueKind::Integer(i) => i.checked_neg().map(Value::integer).unwrap_or_else(Value::null),
        ValueKind::Long(i) => i.checked_neg().map(Value::long).unwrap_or_else(Value::null),
        ValueKind::Decimal(d) => Value::clamped_decimal(-d),
        _ => return Err(EvalError::Internal("negate on non-numeric".into())),
    })
}

fn ceiling(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let d = operands[0].to_decimal()?;
    Ok(d.ceil().to_i32().map(Value::integer).unwrap_or_else(Value::null))
}

fn floor(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let d = operands[0].to_decimal()?;
    Ok(d.floor().to_i32().map(Value::integer).unwrap_or_else(Value::null))
}

fn round(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let value = operands[0].to_decimal()?;
    let precision: u32 = match operands.get(1) {
        Some(p) if !p.is_null() => {
            let raw = p.to_int32()?;
            if raw < 0 {
                return Err(EvalError::DomainError("Round precision must not be negative".into()));
            }
            raw as u32
        }
        _ => 0,
    };
    // CQL convention: a value sitting exactly on the midpoint rounds
    // toward zero rather than away from it.
    Ok(Value::decimal(value.round_dp_with_strategy(precision, rust_decimal::RoundingStrategy::MidpointTowardZero)))
}

fn truncate(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let d = operands[0].to_decimal()?;
    Ok(d.trunc().to_i32().map(Value::integer).unwrap_or_else(Value::null))
}

fn exp(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let d = operands[0].to_decimal()?;
    Ok(d.checked_exp().map(Value::clamped_decimal).unwrap_or_else(Value::null))
}

fn ln(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let d = operands[0].to_decimal()?;
    if d <= Decimal::ZERO {
        return Ok(Value::null());
    }
    Ok(d.checked_ln().map(Value::clamped_decimal).unwrap_or_else(Value::null))
}

fn log(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let value = operands[0].to_decimal()?;
    let base = operands[1].to_decimal()?;
    if value <= Decimal::ZERO || base <= Decimal::ZERO || base == Decimal::ONE {
        return Ok(Value::null());
    }
    let (Some(ln_value), Some(ln_base)) = (value.checked_ln(), base.checked_ln()) else {
        return Ok(Value::null());
    };
    if ln_base.is_zero() {
        return Ok(Value::null());
    }
    Ok(Value::clamped_decimal(ln_value / ln_base))
}

fn precision(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let digits = match operands[0].provenance.as_ref().and_then(|p| p.literal_text.as_deref()) {
        Some(text) => decimal_precision_from_text(text),
        None => {
            let d = operands[0].to_decimal()?;
            decimal_precision_from_text(&d.normalize().to_string())
        }
    };
    Ok(Value::integer(digits as i32))
}

fn temporal_precision(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let digits = match &operands[0].kind {
        ValueKind::Date(d) => digit_count(d.precision),
        ValueKind::DateTime(dt) => digit_count(dt.precision),
        ValueKind::Time(t) => digit_count(t.precision),
        _ => return Err(EvalError::TypeMismatch(format!("Precision does not support {}", operands[0].type_name()))),
    };
    Ok(Value::integer(digits as i32))
}

/// Half the width of the last representable digit at `precision` decimal
/// places, i.e. the uncertainty `HighBoundary`/`LowBoundary` straddle.
fn half_unit_at(precision: u32) -> Decimal {
    Decimal::new(5, precision + 1)
}

fn high_boundary(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let value = operands[0].to_decimal()?;
    let digits = operands[1].to_int32()? as u32;
    Ok(Value::clamped_decimal(value + half_unit_at(digits)))
}

fn low_boundary(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    let value = operands[0].to_decimal()?;
    let digits = operands[1].to_int32()? as u32;
    Ok(Value::clamped_decimal(value - half_unit_at(digits)))
}

fn predecessor(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    step_decimal(&operands[0], false)
}

fn successor(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    propagate_null!(operands);
    step_decimal(&operands[0], true)
}

/// Steps a Decimal/Quantity by ε = 10⁻⁸ (spec.md §4.7); Integer/Long step
/// by one, failing past the type's bound.
fn step_decimal(value: &Value, forward: bool) -> EvalResult<Value> {
    const EPSILON: &str = "0.00000001";
    let epsilon: Decimal = EPSILON.parse().unwrap();
    match &value.kind {
        ValueKind::Decimal(d) => {
            Ok(Value::clamped_decimal(if forward { *d + epsilon } else { *d - epsilon }))
        }
        ValueKind::Quantity { value: v, unit } => {
            let next = if forward { *v + epsilon } else { *v - epsilon };
            Ok(Value { kind: ValueKind::Quantity { value: next, unit: unit.clone() }, provenance: None })
        }
        ValueKind::Integer(i) => {
            let next = if forward { i.checked_add(1) } else { i.checked_sub(1) };
            Ok(next.map(Value::integer).unwrap_or_else(Value::null))
        }
        ValueKind::Long(i) => {
            let next = if forward { i.checked_add(1) } else { i.checked_sub(1) };
            Ok(next.map(Value::long).unwrap_or_else(Value::null))
        }
        _ => Err(EvalError::TypeMismatch(format!("Predecessor/Successor do not support {}", value.type_name()))),
    }
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    for tags in [[Integer, Integer], [Long, Long], [Decimal, Decimal]] {
        table.register(Operator::Add, &tags, add);
        table.register(Operator::Subtract, &tags, subtract);
        table.register(Operator::Multiply, &tags, multiply);
        table.register(Operator::TruncatedDivide, &tags, truncated_divide);
        table.register(Operator::Modulo, &tags, modulo);
    }
    for tags in [[Integer, Integer], [Long, Long], [Decimal, Decimal], [Integer, Decimal], [Decimal, Integer]] {
        table.register(Operator::Divide, &tags, divide);
    }
    table.register(Operator::Add, &[Quantity, Quantity], crate::operators::datetime::add_quantities);
    table.register(Operator::Subtract, &[Quantity, Quantity], crate::operators::datetime::subtract_quantities);
    table.register(Operator::TruncatedDivide, &[Quantity, Quantity], crate::operators::datetime::truncated_divide_quantities);
    table.register(Operator::Divide, &[Quantity, Quantity], crate::operators::datetime::divide_quantities);

    table.register(Operator::Power, &[Integer, Integer], power);
    table.register(Operator::Power, &[Long, Integer], power);
    table.register(Operator::Power, &[Decimal, Decimal], power);
    table.register(Operator::Power, &[Decimal, Integer], power);

    for tag in [Integer, Long, Decimal] {
        table.register(Operator::Abs, &[tag], abs);
        table.register(Operator::Negate, &[tag], negate);
        table.register(Operator::Predecessor, &[tag], predecessor);
        table.register(Operator::Successor, &[tag], successor);
    }
    table.register(Operator::Predecessor, &[Quantity], predecessor);
    table.register(Operator::Successor, &[Quantity], successor);

    table.register(Operator::Ceiling, &[Decimal], ceiling);
    table.register(Operator::Floor, &[Decimal], floor);
    table.register(Operator::Round, &[Decimal], round);
    table.register(Operator::Round, &[Decimal, Integer], round);
    table.register(Operator::Truncate, &[Decimal], truncate);
    table.register(Operator::Exp, &[Decimal], exp);
    table.register(Operator::Exp, &[Integer], exp);
    table.register(Operator::Ln, &[Decimal], ln);
    table.register(Operator::Log, &[Decimal, Decimal], log);
    table.register(Operator::Precision, &[Decimal], precision);
    table.register(Operator::Precision, &[Date], temporal_precision);
    table.register(Operator::Precision, &[DateTime], temporal_precision);
    table.register(Operator::Precision, &[Time], temporal_precision);
    table.register(Operator::HighBoundary, &[Decimal, Integer], high_boundary);
    table.register(Operator::LowBoundary, &[Decimal, Integer], low_boundary);
}
