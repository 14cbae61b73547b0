//! Three-valued logic and the null-aware operators (spec.md §4.6.1).

use cql_ast::{Operator, TemporalPrecision};

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::EvalResult;
use crate::value::{Value, ValueKind};

fn opt_bool(v: &Value) -> Option<bool> {
    match v.kind {
        ValueKind::Boolean(b) => Some(b),
        _ => None,
    }
}

fn and(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(match (opt_bool(&operands[0]), opt_bool(&operands[1])) {
        (Some(false), _) | (_, Some(false)) => Value::boolean(false),
        (Some(true), Some(true)) => Value::boolean(true),
        _ => Value::null(),
    })
}

fn or(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(match (opt_bool(&operands[0]), opt_bool(&operands[1])) {
        (Some(true), _) | (_, Some(true)) => Value::boolean(true),
        (Some(false), Some(false)) => Value::boolean(false),
        _ => Value::null(),
    })
}

fn xor(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(match (opt_bool(&operands[0]), opt_bool(&operands[1])) {
        (Some(a), Some(b)) => Value::boolean(a != b),
        _ => Value::null(),
    })
}

fn implies(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(match (opt_bool(&operands[0]), opt_bool(&operands[1])) {
        (Some(false), _) => Value::boolean(true),
        (_, Some(true)) => Value::boolean(true),
        (Some(true), Some(false)) => Value::boolean(false),
        _ => Value::null(),
    })
}

fn not(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(match opt_bool(&operands[0]) {
        Some(b) => Value::boolean(!b),
        None => Value::null(),
    })
}

fn is_null(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(Value::boolean(operands[0].is_null()))
}

fn is_true(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(Value::boolean(opt_bool(&operands[0]) == Some(true)))
}

fn is_false(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    Ok(Value::boolean(opt_bool(&operands[0]) == Some(false)))
}

fn coalesce(operands: &[Value], _precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    for operand in operands {
        if !operand.is_null() {
            return Ok(operand.clone());
        }
    }
    Ok(Value::null())
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    table.register(Operator::And, &[Boolean, Boolean], and);
    table.register(Operator::Or, &[Boolean, Boolean], or);
    table.register(Operator::Xor, &[Boolean, Boolean], xor);
    table.register(Operator::Implies, &[Boolean, Boolean], implies);
    table.register(Operator::Not, &[Boolean], not);

    // IsNull/IsTrue/IsFalse/Coalesce accept any variant — a single
    // `Null`-tagged registration is a full wildcard on both sides.
    table.register(Operator::IsNull, &[Null], is_null);
    table.register(Operator::IsTrue, &[Null], is_true);
    table.register(Operator::IsFalse, &[Null], is_false);
    for n in 1..=8 {
        let tags = vec![Null; n];
        table.register(Operator::Coalesce, &tags, coalesce);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(v: bool) -> Value {
        Value::boolean(v)
    }

    #[test]
    fn and_follows_the_three_valued_truth_table() {
        assert_eq!(and(&[b(false), Value::null()], None).unwrap().to_bool().unwrap(), false);
        assert_eq!(and(&[Value::null(), b(false)], None).unwrap().to_bool().unwrap(), false);
        assert!(and(&[b(true), Value::null()], None).unwrap().is_null());
        assert_eq!(and(&[b(true), b(true)], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn or_follows_the_three_valued_truth_table() {
        assert_eq!(or(&[b(true), Value::null()], None).unwrap().to_bool().unwrap(), true);
        assert!(or(&[b(false), Value::null()], None).unwrap().is_null());
        assert_eq!(or(&[b(false), b(false)], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn xor_is_null_when_either_side_is_null() {
        assert!(xor(&[b(true), Value::null()], None).unwrap().is_null());
        assert_eq!(xor(&[b(true), b(false)], None).unwrap().to_bool().unwrap(), true);
        assert_eq!(xor(&[b(true), b(true)], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn implies_short_circuits_on_false_antecedent_or_true_consequent() {
        assert_eq!(implies(&[b(false), Value::null()], None).unwrap().to_bool().unwrap(), true);
        assert_eq!(implies(&[Value::null(), b(true)], None).unwrap().to_bool().unwrap(), true);
        assert!(implies(&[Value::null(), Value::null()], None).unwrap().is_null());
        assert_eq!(implies(&[b(true), b(false)], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn not_propagates_null() {
        assert!(not(&[Value::null()], None).unwrap().is_null());
        assert_eq!(not(&[b(true)], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn is_null_is_true_true_and_is_false_never_propagate_null() {
        assert_eq!(is_null(&[Value::null()], None).unwrap().to_bool().unwrap(), true);
        assert_eq!(is_true(&[Value::null()], None).unwrap().to_bool().unwrap(), false);
        assert_eq!(is_false(&[b(false)], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn coalesce_returns_the_first_non_null_operand() {
        let result = coalesce(&[Value::null(), Value::null(), Value::integer(7)], None).unwrap();
        assert_eq!(result.to_int32().unwrap(), 7);
        assert!(coalesce(&[Value::null(), Value::null()], None).unwrap().is_null());
    }
}
