//! List indexing and reduction operators (spec.md §4.6.6).

use cql_ast::{Operator, TemporalPrecision, Type};

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

fn element_type_of(list: &Value) -> Type {
    match &list.kind {
        ValueKind::List { element_type, .. } => element_type.clone(),
        _ => Type::Any,
    }
}

fn indexer(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let idx = operands[1].to_int32()?;
    if idx < 0 {
        return Ok(Value::null());
    }
    Ok(items.get(idx as usize).cloned().unwrap_or_else(Value::null))
}

fn first(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    Ok(items.first().cloned().unwrap_or_else(Value::null))
}

fn last(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    Ok(items.last().cloned().unwrap_or_else(Value::null))
}

fn exists(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::boolean(false));
    }
    let items = operands[0].to_list()?;
    Ok(Value::boolean(items.iter().any(|v| !v.is_null())))
}

fn singleton_from(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    match items.len() {
        0 => Ok(Value::null()),
        1 => Ok(items[0].clone()),
        _ => Err(EvalError::DomainError("SingletonFrom requires a list of at most one element".into())),
    }
}

fn tail(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let rest = if items.is_empty() { Vec::new() } else { items[1..].to_vec() };
    Ok(Value::list(rest, element_type_of(&operands[0])))
}

fn take(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let n = operands[1].to_int32()?.max(0) as usize;
    Ok(Value::list(items.iter().take(n).cloned().collect(), element_type_of(&operands[0])))
}

fn skip(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let n = operands[1].to_int32()?.max(0) as usize;
    Ok(Value::list(items.iter().skip(n).cloned().collect(), element_type_of(&operands[0])))
}

fn index_of(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::integer(-1));
    }
    let items = operands[0].to_list()?;
    for (i, item) in items.iter().enumerate() {
        if matches!(item.equal(&operands[1]).kind, ValueKind::Boolean(true)) {
            return Ok(Value::integer(i as i32));
        }
    }
    Ok(Value::integer(-1))
}

fn flatten(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let mut out = Vec::with_capacity(items.len());
    let mut inner_type = element_type_of(&operands[0]);
    for item in items {
        match &item.kind {
            ValueKind::List { items: nested, element_type } => {
                inner_type = element_type.clone();
                out.extend(nested.iter().cloned());
            }
            _ => out.push(item.clone()),
        }
    }
    Ok(Value::list(out, inner_type))
}

fn distinct(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        let seen = out.iter().any(|existing| matches!(existing.equivalent(item).kind, ValueKind::Boolean(true)));
        if !seen {
            out.push(item.clone());
        }
    }
    Ok(Value::list(out, element_type_of(&operands[0])))
}

fn length(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::integer(0));
    }
    let items = operands[0].to_list()?;
    Ok(Value::integer(items.len() as i32))
}

fn in_list(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[1].is_null() {
        return Ok(Value::null());
    }
    let items = operands[1].to_list()?;
    Ok(Value::boolean(items.iter().any(|item| matches!(item.equivalent(&operands[0]).kind, ValueKind::Boolean(true)))))
}

fn contains_list(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    Ok(Value::boolean(items.iter().any(|item| matches!(item.equivalent(&operands[1]).kind, ValueKind::Boolean(true)))))
}

fn dedup_push(out: &mut Vec<Value>, item: &Value) {
    let seen = out.iter().any(|existing| matches!(existing.equivalent(item).kind, ValueKind::Boolean(true)));
    if !seen {
        out.push(item.clone());
    }
}

fn union_list(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, b) = (operands[0].to_list()?, operands[1].to_list()?);
    let mut out = Vec::with_capacity(a.len() + b.len());
    for item in a.iter().chain(b.iter()) {
        dedup_push(&mut out, item);
    }
    Ok(Value::list(out, element_type_of(&operands[0])))
}

fn intersect_list(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, b) = (operands[0].to_list()?, operands[1].to_list()?);
    let mut out = Vec::new();
    for item in a {
        let in_b = b.iter().any(|other| matches!(item.equivalent(other).kind, ValueKind::Boolean(true)));
        if in_b {
            dedup_push(&mut out, item);
        }
    }
    Ok(Value::list(out, element_type_of(&operands[0])))
}

fn except_list(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let (a, b) = (operands[0].to_list()?, operands[1].to_list()?);
    let mut out = Vec::new();
    for item in a {
        let in_b = b.iter().any(|other| matches!(item.equivalent(other).kind, ValueKind::Boolean(true)));
        if !in_b {
            dedup_push(&mut out, item);
        }
    }
    Ok(Value::list(out, element_type_of(&operands[0])))
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    table.register(Operator::Indexer, &[List, Integer], indexer);
    table.register(Operator::First, &[List], first);
    table.register(Operator::Last, &[List], last);
    table.register(Operator::Exists, &[List], exists);
    table.register(Operator::SingletonFrom, &[List], singleton_from);
    table.register(Operator::Tail, &[List], tail);
    table.register(Operator::Take, &[List, Integer], take);
    table.register(Operator::Skip, &[List, Integer], skip);
    table.register(Operator::IndexOf, &[List, Null], index_of);
    table.register(Operator::Flatten, &[List], flatten);
    table.register(Operator::Distinct, &[List], distinct);
    table.register(Operator::Length, &[List], length);
    table.register(Operator::In, &[Null, List], in_list);
    table.register(Operator::Contains, &[List, Null], contains_list);
    table.register(Operator::Union, &[List, List], union_list);
    table.register(Operator::Intersect, &[List, List], intersect_list);
    table.register(Operator::Except, &[List, List], except_list);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_list(values: &[i32]) -> Value {
        Value::list(values.iter().map(|v| Value::integer(*v)).collect(), Type::Integer)
    }

    #[test]
    fn indexer_is_null_on_negative_or_out_of_range_index() {
        let list = int_list(&[1, 2, 3]);
        assert_eq!(indexer(&[list.clone(), Value::integer(1)], None).unwrap().to_int32().unwrap(), 2);
        assert!(indexer(&[list.clone(), Value::integer(-1)], None).unwrap().is_null());
        assert!(indexer(&[list, Value::integer(10)], None).unwrap().is_null());
    }

    #[test]
    fn first_and_last_are_null_on_empty_list() {
        let empty = int_list(&[]);
        assert!(first(&[empty.clone()], None).unwrap().is_null());
        assert!(last(&[empty], None).unwrap().is_null());
        let list = int_list(&[1, 2, 3]);
        assert_eq!(first(&[list.clone()], None).unwrap().to_int32().unwrap(), 1);
        assert_eq!(last(&[list], None).unwrap().to_int32().unwrap(), 3);
    }

    #[test]
    fn exists_ignores_null_elements() {
        let list = Value::list(vec![Value::null(), Value::null()], Type::Integer);
        assert_eq!(exists(&[list], None).unwrap().to_bool().unwrap(), false);
        let list = Value::list(vec![Value::null(), Value::integer(1)], Type::Integer);
        assert_eq!(exists(&[list], None).unwrap().to_bool().unwrap(), true);
    }

    #[test]
    fn singleton_from_errors_on_more_than_one_element() {
        let empty = int_list(&[]);
        assert!(singleton_from(&[empty], None).unwrap().is_null());
        let one = int_list(&[5]);
        assert_eq!(singleton_from(&[one], None).unwrap().to_int32().unwrap(), 5);
        let many = int_list(&[1, 2]);
        assert!(singleton_from(&[many], None).is_err());
    }

    #[test]
    fn tail_drops_the_first_element() {
        let list = int_list(&[1, 2, 3]);
        let result = tail(&[list], None).unwrap();
        let items = result.to_list().unwrap();
        assert_eq!(items.iter().map(|v| v.to_int32().unwrap()).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn take_and_skip_clamp_at_list_bounds() {
        let list = int_list(&[1, 2, 3]);
        let taken = take(&[list.clone(), Value::integer(10)], None).unwrap();
        assert_eq!(taken.to_list().unwrap().len(), 3);
        let skipped = skip(&[list, Value::integer(2)], None).unwrap();
        assert_eq!(skipped.to_list().unwrap().iter().map(|v| v.to_int32().unwrap()).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn index_of_returns_negative_one_when_absent() {
        let list = int_list(&[1, 2, 3]);
        assert_eq!(index_of(&[list.clone(), Value::integer(2)], None).unwrap().to_int32().unwrap(), 1);
        assert_eq!(index_of(&[list, Value::integer(9)], None).unwrap().to_int32().unwrap(), -1);
    }

    #[test]
    fn flatten_merges_one_level_of_nesting() {
        let inner_a = int_list(&[1, 2]);
        let inner_b = int_list(&[3]);
        let outer = Value::list(vec![inner_a, inner_b], Type::List(Box::new(Type::Integer)));
        let result = flatten(&[outer], None).unwrap();
        let items = result.to_list().unwrap();
        assert_eq!(items.iter().map(|v| v.to_int32().unwrap()).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn distinct_removes_equivalent_duplicates() {
        let list = int_list(&[1, 2, 2, 3, 1]);
        let result = distinct(&[list], None).unwrap();
        let items = result.to_list().unwrap();
        assert_eq!(items.iter().map(|v| v.to_int32().unwrap()).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn length_is_zero_on_null_list() {
        assert_eq!(length(&[Value::null()], None).unwrap().to_int32().unwrap(), 0);
        assert_eq!(length(&[int_list(&[1, 2])], None).unwrap().to_int32().unwrap(), 2);
    }

    #[test]
    fn in_list_and_contains_list_are_equivalent_based_membership() {
        let list = int_list(&[1, 2, 3]);
        assert_eq!(in_list(&[Value::integer(3), list.clone()], None).unwrap().to_bool().unwrap(), true);
        assert_eq!(in_list(&[Value::integer(9), list.clone()], None).unwrap().to_bool().unwrap(), false);
        assert_eq!(contains_list(&[list.clone(), Value::integer(2)], None).unwrap().to_bool().unwrap(), true);
        assert!(in_list(&[Value::integer(1), Value::null()], None).unwrap().is_null());
        assert!(contains_list(&[Value::null(), Value::integer(1)], None).unwrap().is_null());
    }

    #[test]
    fn union_intersect_except_dedupe_and_combine_by_equivalence() {
        let a = int_list(&[1, 2, 3]);
        let b = int_list(&[2, 3, 4]);

        let union = union_list(&[a.clone(), b.clone()], None).unwrap();
        let mut union_items: Vec<i32> = union.to_list().unwrap().iter().map(|v| v.to_int32().unwrap()).collect();
        union_items.sort();
        assert_eq!(union_items, vec![1, 2, 3, 4]);

        let intersect = intersect_list(&[a.clone(), b.clone()], None).unwrap();
        let mut intersect_items: Vec<i32> = intersect.to_list().unwrap().iter().map(|v| v.to_int32().unwrap()).collect();
        intersect_items.sort();
        assert_eq!(intersect_items, vec![2, 3]);

        let except = except_list(&[a, b], None).unwrap();
        let except_items: Vec<i32> = except.to_list().unwrap().iter().map(|v| v.to_int32().unwrap()).collect();
        assert_eq!(except_items, vec![1]);
    }

    #[test]
    fn union_intersect_except_are_null_when_either_side_is_null() {
        let list = int_list(&[1]);
        assert!(union_list(&[list.clone(), Value::null()], None).unwrap().is_null());
        assert!(intersect_list(&[Value::null(), list.clone()], None).unwrap().is_null());
        assert!(except_list(&[list, Value::null()], None).unwrap().is_null());
    }
}
