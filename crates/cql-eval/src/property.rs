//! Property access on Tuples, Named records, choice fields, Lists,
//! temporal wrappers, and the built-in structured types (spec.md §4.8).

use std::sync::Arc;

use cql_ast::Type;
use cql_model::{DataModelRegistry, PropertyInfo, PropertyShape, PropertyValue, ResourceHandle};

use crate::error::{EvalError, EvalResult};
use crate::temporal::{CqlDate, CqlDateTime, CqlTime};
use crate::value::{Value, ValueKind};

/// Resolves `path` off `source`, per the per-kind rules in spec.md §4.8.
pub fn access(source: &Value, path: &str, registry: &dyn DataModelRegistry) -> EvalResult<Value> {
    if source.is_null() {
        return Ok(Value::null());
    }
    match &source.kind {
        ValueKind::Tuple(fields) => Ok(fields.get(path).cloned().unwrap_or_else(Value::null)),
        ValueKind::Named { handle, runtime_type } => named_property(handle, runtime_type, path, registry),
        ValueKind::List { items, element_type } => {
            let mut out = Vec::with_capacity(items.len());
            let mut inner_type = element_type.clone();
            for item in items {
                let sub = access(item, path, registry)?;
                match &sub.kind {
                    ValueKind::List { items: nested, element_type: nested_type } => {
                        inner_type = nested_type.clone();
                        out.extend(nested.iter().cloned());
                    }
                    _ => {
                        inner_type = sub.runtime_type();
                        out.push(sub);
                    }
                }
            }
            Ok(Value::list(out, inner_type))
        }
        ValueKind::Interval { low, high, low_inclusive, high_inclusive } => match path {
            "low" => Ok((**low).clone()),
            "high" => Ok((**high).clone()),
            "lowClosed" => Ok(Value::boolean(*low_inclusive)),
            "highClosed" => Ok(Value::boolean(*high_inclusive)),
            other => Err(EvalError::NotFound(format!("Interval has no field '{other}'"))),
        },
        ValueKind::Quantity { value, unit } => match path {
            "value" => Ok(Value::decimal(*value)),
            "unit" => Ok(Value::string(unit.clone())),
            other => Err(EvalError::NotFound(format!("Quantity has no field '{other}'"))),
        },
        ValueKind::Code(code) => match path {
            "code" => Ok(Value::string(code.code.clone())),
            "system" => Ok(code.system.clone().map(Value::string).unwrap_or_else(Value::null)),
            "version" => Ok(code.version.clone().map(Value::string).unwrap_or_else(Value::null)),
            "display" => Ok(code.display.clone().map(Value::string).unwrap_or_else(Value::null)),
            other => Err(EvalError::NotFound(format!("Code has no field '{other}'"))),
        },
        ValueKind::Concept { codes, display } => match path {
            "codes" => Ok(Value::list(codes.iter().cloned().map(|c| Value { kind: ValueKind::Code(c), provenance: None }).collect(), Type::Code)),
            "display" => Ok(display.clone().map(Value::string).unwrap_or_else(Value::null)),
            other => Err(EvalError::NotFound(format!("Concept has no field '{other}'"))),
        },
        ValueKind::CodeSystem { id, version } => match path {
            "id" => Ok(Value::string(id.clone())),
            "version" => Ok(version.clone().map(Value::string).unwrap_or_else(Value::null)),
            other => Err(EvalError::NotFound(format!("CodeSystem has no field '{other}'"))),
        },
        ValueKind::ValueSet { id, version } => match path {
            "id" => Ok(Value::string(id.clone())),
            "version" => Ok(version.clone().map(Value::string).unwrap_or_else(Value::null)),
            other => Err(EvalError::NotFound(format!("ValueSet has no field '{other}'"))),
        },
        _ => Err(EvalError::TypeMismatch(format!("cannot access property '{path}' on {}", source.type_name()))),
    }
}

fn named_property(handle: &Arc<dyn ResourceHandle>, runtime_type: &str, path: &str, registry: &dyn DataModelRegistry) -> EvalResult<Value> {
    let info = registry
        .property(runtime_type, path)
        .ok_or_else(|| EvalError::NotFound(format!("no property '{path}' on type '{runtime_type}'")))?;
    match &info.shape {
        PropertyShape::Scalar(type_name) => {
            let raw = handle.get(&info.canonical_name).unwrap_or(PropertyValue::Null);
            property_value_to_value(&raw, type_name, registry)
        }
        PropertyShape::List(element_type_name) => {
            let raw = handle.get(&info.canonical_name).unwrap_or(PropertyValue::Null);
            match raw {
                PropertyValue::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in &items {
                        out.push(property_value_to_value(item, element_type_name, registry)?);
                    }
                    Ok(Value::list(out, named_or_builtin_type(element_type_name)))
                }
                PropertyValue::Null => Ok(Value::list(Vec::new(), named_or_builtin_type(element_type_name))),
                other => property_value_to_value(&other, element_type_name, registry),
            }
        }
        PropertyShape::Choice(variants) => {
            let mut found: Option<(&str, &str, PropertyValue)> = None;
            for (discriminant, type_name) in variants {
                if let Some(raw) = handle.get(discriminant) {
                    if matches!(raw, PropertyValue::Null) {
                        continue;
                    }
                    if found.is_some() {
                        return Err(EvalError::TypeMismatch(format!(
                            "ChoiceTypeRepeated: more than one variant set for choice property '{path}'"
                        )));
                    }
                    found = Some((discriminant, type_name, raw));
                }
            }
            match found {
                None => Ok(Value::null()),
                Some((_, type_name, raw)) => property_value_to_value(&raw, type_name, registry),
            }
        }
    }
}

fn named_or_builtin_type(type_name: &str) -> Type {
    match type_name {
        "Boolean" => Type::Boolean,
        "Integer" => Type::Integer,
        "Long" => Type::Long,
        "Decimal" => Type::Decimal,
        "String" => Type::String,
        "Date" => Type::Date,
        "DateTime" => Type::DateTime,
        "Time" => Type::Time,
        "Quantity" => Type::Quantity,
        "Code" => Type::Code,
        "Concept" => Type::Concept,
        other => Type::Named(other.to_string()),
    }
}

fn property_value_to_value(raw: &PropertyValue, type_name: &str, _registry: &dyn DataModelRegistry) -> EvalResult<Value> {
    match raw {
        PropertyValue::Null => Ok(Value::null()),
        PropertyValue::Boolean(b) => Ok(Value::boolean(*b)),
        PropertyValue::Integer(i) => match type_name {
            "Long" => Ok(Value::long(*i)),
            _ => i32::try_from(*i)
                .map(Value::integer)
                .map_err(|_| EvalError::TypeMismatch(format!("Integer property overflowed System.Integer: {i}"))),
        },
        PropertyValue::Decimal(d) => {
            rust_decimal::Decimal::try_from(*d).map(Value::decimal).map_err(|_| EvalError::TypeMismatch(format!("non-finite Decimal property value: {d}")))
        }
        PropertyValue::String(s) => Ok(Value::string(s.clone())),
        PropertyValue::Temporal(text) => match type_name {
            "Date" => CqlDate::parse(&format!("@{text}")).map(|d| Value { kind: ValueKind::Date(d), provenance: None }),
            "DateTime" => CqlDateTime::parse(&format!("@{text}")).map(|d| Value { kind: ValueKind::DateTime(d), provenance: None }),
            "Time" => CqlTime::parse(&format!("@{text}")).map(|t| Value { kind: ValueKind::Time(t), provenance: None }),
            other => Err(EvalError::Internal(format!("Temporal property value for non-temporal type '{other}'"))),
        },
        PropertyValue::Resource(handle) => {
            let runtime_type = handle.resource_type().unwrap_or(type_name).to_string();
            Ok(Value { kind: ValueKind::Named { handle: handle.clone(), runtime_type }, provenance: None })
        }
        PropertyValue::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(property_value_to_value(item, type_name, _registry)?);
            }
            Ok(Value::list(out, named_or_builtin_type(type_name)))
        }
    }
}
