//! String manipulation operators (spec.md §4.6.7).

use cql_ast::{Operator, TemporalPrecision, Type};
use regex::Regex;

use crate::dispatch::{DispatchTable, OperandTag};
use crate::error::{EvalError, EvalResult};
use crate::value::Value;

fn concatenate(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    Ok(Value::string(format!("{}{}", operands[0].to_str()?, operands[1].to_str()?)))
}

fn combine(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let items = operands[0].to_list()?;
    let separator = match operands.get(1) {
        Some(sep) if !sep.is_null() => sep.to_str()?,
        _ => "",
    };
    let parts: Vec<&str> = items
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_str())
        .collect::<EvalResult<_>>()?;
    Ok(Value::string(parts.join(separator)))
}

fn split(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    let source = operands[0].to_str()?;
    let separator = match operands.get(1) {
        Some(sep) if !sep.is_null() => sep.to_str()?.to_string(),
        _ => ",".to_string(),
    };
    let pieces: Vec<Value> = source.split(separator.as_str()).map(Value::string).collect();
    Ok(Value::list(pieces, Type::String))
}

fn upper(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    Ok(Value::string(operands[0].to_str()?.to_uppercase()))
}

fn lower(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() {
        return Ok(Value::null());
    }
    Ok(Value::string(operands[0].to_str()?.to_lowercase()))
}

fn starts_with(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    Ok(Value::boolean(operands[0].to_str()?.starts_with(operands[1].to_str()?)))
}

fn ends_with(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    Ok(Value::boolean(operands[0].to_str()?.ends_with(operands[1].to_str()?)))
}

fn substring(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let source: Vec<char> = operands[0].to_str()?.chars().collect();
    let start = operands[1].to_int32()?;
    if start < 0 || start as usize > source.len() {
        return Ok(Value::null());
    }
    let start = start as usize;
    let end = match operands.get(2) {
        Some(len) if !len.is_null() => (start + len.to_int32()?.max(0) as usize).min(source.len()),
        _ => source.len(),
    };
    Ok(Value::string(source[start..end].iter().collect::<String>()))
}

fn position_of(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let pattern = operands[0].to_str()?;
    let source = operands[1].to_str()?;
    match source.find(pattern) {
        Some(byte_idx) => Ok(Value::integer(source[..byte_idx].chars().count() as i32)),
        None => Ok(Value::integer(-1)),
    }
}

fn last_position_of(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let pattern = operands[0].to_str()?;
    let source = operands[1].to_str()?;
    match source.rfind(pattern) {
        Some(byte_idx) => Ok(Value::integer(source[..byte_idx].chars().count() as i32)),
        None => Ok(Value::integer(-1)),
    }
}

fn compile(pattern: &str) -> EvalResult<Regex> {
    Regex::new(pattern).map_err(|e| EvalError::DomainError(format!("invalid regular expression '{pattern}': {e}")))
}

fn matches(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() {
        return Ok(Value::null());
    }
    let source = operands[0].to_str()?;
    let pattern = operands[1].to_str()?;
    let re = compile(pattern)?;
    Ok(Value::boolean(re.find(source).map(|m| m.start() == 0 && m.end() == source.len()).unwrap_or(false)))
}

fn replace_matches(operands: &[Value], _p: Option<TemporalPrecision>) -> EvalResult<Value> {
    if operands[0].is_null() || operands[1].is_null() || operands[2].is_null() {
        return Ok(Value::null());
    }
    let source = operands[0].to_str()?;
    let pattern = operands[1].to_str()?;
    let replacement = operands[2].to_str()?;
    let re = compile(pattern)?;
    Ok(Value::string(re.replace_all(source, replacement).into_owned()))
}

pub fn register(table: &mut DispatchTable) {
    use OperandTag::*;
    table.register(Operator::Concatenate, &[String, String], concatenate);
    table.register(Operator::Combine, &[List], combine);
    table.register(Operator::Combine, &[List, String], combine);
    table.register(Operator::Split, &[String], split);
    table.register(Operator::Split, &[String, String], split);
    table.register(Operator::Upper, &[String], upper);
    table.register(Operator::Lower, &[String], lower);
    table.register(Operator::StartsWith, &[String, String], starts_with);
    table.register(Operator::EndsWith, &[String, String], ends_with);
    table.register(Operator::Substring, &[String, Integer], substring);
    table.register(Operator::Substring, &[String, Integer, Integer], substring);
    table.register(Operator::PositionOf, &[String, String], position_of);
    table.register(Operator::LastPositionOf, &[String, String], last_position_of);
    table.register(Operator::Matches, &[String, String], matches);
    table.register(Operator::ReplaceMatches, &[String, String, String], replace_matches);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenate_is_null_propagating() {
        assert!(concatenate(&[Value::string("a"), Value::null()], None).unwrap().is_null());
        let result = concatenate(&[Value::string("a"), Value::string("b")], None).unwrap();
        assert_eq!(result.to_str().unwrap(), "ab");
    }

    #[test]
    fn combine_joins_with_separator_and_skips_nulls() {
        let list = Value::list(vec![Value::string("a"), Value::null(), Value::string("b")], Type::String);
        let result = combine(&[list, Value::string(",")], None).unwrap();
        assert_eq!(result.to_str().unwrap(), "a,b");
    }

    #[test]
    fn split_defaults_to_comma_separator() {
        let result = split(&[Value::string("a,b,c")], None).unwrap();
        let items = result.to_list().unwrap();
        assert_eq!(items.iter().map(|v| v.to_str().unwrap().to_string()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn upper_and_lower_roundtrip() {
        assert_eq!(upper(&[Value::string("abc")], None).unwrap().to_str().unwrap(), "ABC");
        assert_eq!(lower(&[Value::string("ABC")], None).unwrap().to_str().unwrap(), "abc");
    }

    #[test]
    fn substring_clamps_length_and_is_null_out_of_range() {
        let s = Value::string("hello");
        assert_eq!(substring(&[s.clone(), Value::integer(1), Value::integer(3)], None).unwrap().to_str().unwrap(), "ell");
        assert!(substring(&[s, Value::integer(10)], None).unwrap().is_null());
    }

    #[test]
    fn position_of_and_last_position_of_return_negative_one_when_absent() {
        let source = Value::string("ababab");
        assert_eq!(position_of(&[Value::string("ab"), source.clone()], None).unwrap().to_int32().unwrap(), 0);
        assert_eq!(last_position_of(&[Value::string("ab"), source], None).unwrap().to_int32().unwrap(), 4);
        assert_eq!(position_of(&[Value::string("zz"), Value::string("abc")], None).unwrap().to_int32().unwrap(), -1);
    }

    #[test]
    fn matches_requires_a_full_match() {
        assert_eq!(matches(&[Value::string("12345"), Value::string(r"\d+")], None).unwrap().to_bool().unwrap(), true);
        assert_eq!(matches(&[Value::string("12345a"), Value::string(r"\d+")], None).unwrap().to_bool().unwrap(), false);
    }

    #[test]
    fn replace_matches_substitutes_every_occurrence() {
        let result = replace_matches(&[Value::string("a1b2"), Value::string(r"\d"), Value::string("-")], None).unwrap();
        assert_eq!(result.to_str().unwrap(), "a-b-");
    }
}
