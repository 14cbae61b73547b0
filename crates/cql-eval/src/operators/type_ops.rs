//! `Is`/`As` runtime type tests and `Convert`'s fixed conversion table
//! (spec.md §4.6.7). These ride `ExprKind::Is`/`As`/`Convert` rather than
//! the generic `Operator` dispatch table, so the engine calls the
//! functions here directly instead of going through `dispatch`.

use cql_ast::Type;
use rust_decimal::Decimal;

use crate::dispatch::DispatchTable;
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

/// `value is target_type`. Never propagates Null: a Null value's runtime
/// type is `Any`, which matches only `Is Any`.
pub fn is_type(value: &Value, target: &Type) -> Value {
    Value::boolean(&value.runtime_type() == target)
}

/// `value as target_type`. Matching types pass the value through;
/// otherwise a strict cast fails, a non-strict one yields Null.
pub fn as_type(value: &Value, target: &Type, strict: bool) -> EvalResult<Value> {
    if value.is_null() || &value.runtime_type() == target {
        return Ok(value.clone());
    }
    if strict {
        Err(EvalError::TypeMismatch(format!("cannot cast {} as {target}", value.type_name())))
    } else {
        Ok(Value::null())
    }
}

/// `Convert(value, target_type)`: a fixed table of supported coercions.
/// Unsupported pairs fail `UnsupportedConversion` rather than yielding
/// Null, per spec.md §4.6.7.
pub fn convert(value: &Value, target: &Type) -> EvalResult<Value> {
    if value.is_null() {
        return Ok(Value::null());
    }
    let unsupported = || {
        EvalError::UnsupportedConversion(format!("cannot convert {} to {target}", value.type_name()))
    };
    match (&value.kind, target) {
        (ValueKind::Integer(i), Type::Long) => Ok(Value::long(*i as i64)),
        (ValueKind::Integer(i), Type::Decimal) => Ok(Value::decimal(Decimal::from(*i))),
        (ValueKind::Integer(i), Type::String) => Ok(Value::string(i.to_string())),
        (ValueKind::Integer(i), Type::Quantity) => Ok(quantity(Decimal::from(*i), "1")),
        (ValueKind::Long(i), Type::Decimal) => Ok(Value::decimal(Decimal::from(*i))),
        (ValueKind::Long(i), Type::String) => Ok(Value::string(i.to_string())),
        (ValueKind::Long(i), Type::Integer) => i32::try_from(*i).map(Value::integer).map_err(|_| unsupported()),
        (ValueKind::Decimal(d), Type::String) => Ok(Value::string(d.to_string())),
        (ValueKind::Decimal(d), Type::Quantity) => Ok(quantity(*d, "1")),
        (ValueKind::Decimal(d), Type::Integer) => {
            use rust_decimal::prelude::ToPrimitive;
            d.to_i32().map(Value::integer).ok_or_else(unsupported)
        }
        (ValueKind::Decimal(d), Type::Long) => {
            use rust_decimal::prelude::ToPrimitive;
            d.to_i64().map(Value::long).ok_or_else(unsupported)
        }
        (ValueKind::Boolean(b), Type::String) => Ok(Value::string(if *b { "true" } else { "false" })),
        (ValueKind::String(s), Type::Integer) => s.parse::<i32>().map(Value::integer).map_err(|_| unsupported()),
        (ValueKind::String(s), Type::Long) => s.parse::<i64>().map(Value::long).map_err(|_| unsupported()),
        (ValueKind::String(s), Type::Decimal) => s.parse::<Decimal>().map(Value::decimal).map_err(|_| unsupported()),
        (ValueKind::String(s), Type::Boolean) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::boolean(true)),
            "false" => Ok(Value::boolean(false)),
            _ => Err(unsupported()),
        },
        (ValueKind::String(s), Type::Date) => {
            crate::temporal::CqlDate::parse(&format!("@{s}")).map(|d| Value { kind: ValueKind::Date(d), provenance: None })
        }
        (ValueKind::String(s), Type::DateTime) => {
            crate::temporal::CqlDateTime::parse(&format!("@{s}")).map(|d| Value { kind: ValueKind::DateTime(d), provenance: None })
        }
        (ValueKind::String(s), Type::Time) => {
            crate::temporal::CqlTime::parse(&format!("@{s}")).map(|t| Value { kind: ValueKind::Time(t), provenance: None })
        }
        (ValueKind::Quantity { value, unit }, Type::Decimal) if unit == "1" => Ok(Value::decimal(*value)),
        (ValueKind::Date(d), Type::DateTime) => Ok(Value {
            kind: ValueKind::DateTime(crate::temporal::CqlDateTime {
                date: d.date,
                time: chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                offset: chrono::FixedOffset::east_opt(0).unwrap(),
                precision: d.precision,
            }),
            provenance: None,
        }),
        _ => Err(unsupported()),
    }
}

fn quantity(value: Decimal, unit: &str) -> Value {
    Value { kind: ValueKind::Quantity { value, unit: unit.to_string() }, provenance: None }
}

/// No `Operator` variants remain for this family: `Is`/`As`/`Convert`
/// are `ExprKind` nodes the engine calls directly (see above).
pub fn register(_table: &mut DispatchTable) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_type_never_matches_on_a_null_value_unless_target_is_any() {
        assert_eq!(is_type(&Value::null(), &Type::Any).to_bool().unwrap(), true);
        assert_eq!(is_type(&Value::null(), &Type::Integer).to_bool().unwrap(), false);
        assert_eq!(is_type(&Value::integer(1), &Type::Integer).to_bool().unwrap(), true);
    }

    #[test]
    fn as_type_passes_through_null_and_matching_type() {
        assert!(as_type(&Value::null(), &Type::Integer, false).unwrap().is_null());
        let v = Value::integer(5);
        assert_eq!(as_type(&v, &Type::Integer, false).unwrap().to_int32().unwrap(), 5);
    }

    #[test]
    fn as_type_strict_fails_on_mismatch_nonstrict_yields_null() {
        let v = Value::integer(5);
        assert!(as_type(&v, &Type::String, true).is_err());
        assert!(as_type(&v, &Type::String, false).unwrap().is_null());
    }

    #[test]
    fn convert_supports_the_documented_widening_table() {
        assert_eq!(convert(&Value::integer(3), &Type::Long).unwrap().to_int64().unwrap(), 3);
        assert_eq!(convert(&Value::integer(3), &Type::Decimal).unwrap().to_decimal().unwrap(), Decimal::from(3));
        assert_eq!(convert(&Value::string("42"), &Type::Integer).unwrap().to_int32().unwrap(), 42);
    }

    #[test]
    fn convert_rejects_unsupported_pairs_instead_of_returning_null() {
        let err = convert(&Value::boolean(true), &Type::Integer).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedConversion(_)));
    }

    #[test]
    fn convert_propagates_null_without_error() {
        assert!(convert(&Value::null(), &Type::Integer).unwrap().is_null());
    }
}
