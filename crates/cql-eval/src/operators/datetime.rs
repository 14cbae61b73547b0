//! Temporal arithmetic: `Quantity ± Quantity` and `Date`/`DateTime` plus
//! or minus a `Quantity` (spec.md §4.6.3).

use cql_ast::{Operator, TemporalPrecision};
use rust_decimal::Decimal;

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

pub fn add_quantities(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, au) = operands[0].to_quantity()?;
    let (b, bu) = operands[1].to_quantity()?;
    if au != bu {
        return Err(EvalError::UnsupportedUnitConversion(format!("cannot add Quantity '{au}' to Quantity '{bu}'")));
    }
    Ok(quantity(a + b, au))
}

pub fn subtract_quantities(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, au) = operands[0].to_quantity()?;
    let (b, bu) = operands[1].to_quantity()?;
    if au != bu {
        return Err(EvalError::UnsupportedUnitConversion(format!("cannot subtract Quantity '{bu}' from Quantity '{au}'")));
    }
    Ok(quantity(a - b, au))
}

pub fn truncated_divide_quantities(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, _) = operands[0].to_quantity()?;
    let (b, _) = operands[1].to_quantity()?;
    if b.is_zero() {
        return Ok(Value::null());
    }
    Ok(quantity((a / b).trunc(), "1"))
}

pub fn divide_quantities(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, _) = operands[0].to_quantity()?;
    let (b, _) = operands[1].to_quantity()?;
    if b.is_zero() {
        return Ok(Value::null());
    }
    Ok(quantity(a / b, "1"))
}

fn quantity(value: Decimal, unit: &str) -> Value {
    Value { kind: ValueKind::Quantity { value, unit: unit.to_string() }, provenance: None }
}

fn decimal_to_i64(d: Decimal) -> EvalResult<i64> {
    use rust_decimal::prelude::ToPrimitive;
    d.round().to_i64().ok_or_else(|| EvalError::DomainError("quantity magnitude out of range".into()))
}

fn add_date_quantity(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    temporal_quantity_op(operands, true)
}

fn subtract_date_quantity(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    temporal_quantity_op(operands, false)
}

fn temporal_quantity_op(operands: &[Value], add: bool) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (magnitude, unit) = operands[1].to_quantity()?;
    let amount = decimal_to_i64(magnitude)?;
    let signed_amount = if add { amount } else { -amount };
    match &operands[0].kind {
        ValueKind::Date(d) => Ok(Value { kind: ValueKind::Date(d.add_quantity(signed_amount, unit)?), provenance: None }),
        ValueKind::DateTime(d) => Ok(Value { kind: ValueKind::DateTime(d.add_quantity(signed_amount, unit)?), provenance: None }),
        _ => Err(EvalError::Internal("temporal_quantity_op called on non-temporal".into())),
    }
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    table.register(Operator::Add, &[Date, Quantity], add_date_quantity);
    table.register(Operator::Subtract, &[Date, Quantity], subtract_date_quantity);
    table.register(Operator::Add, &[DateTime, Quantity], add_date_quantity);
    table.register(Operator::Subtract, &[DateTime, Quantity], subtract_date_quantity);
}
