//! The tagged-union runtime value every operator reads and produces.

use std::sync::Arc;

use cql_ast::{ExprId, Type};
use cql_model::{Code, ResourceHandle};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::error::{EvalError, EvalResult};
use crate::temporal::{CqlDate, CqlDateTime, CqlTime};

/// The CQL decimal range clamp (spec.md §3.1): magnitudes outside this
/// collapse to Null rather than erroring.
pub const DECIMAL_MAX: &str = "99999999999999999999.99999999";

/// A value plus, rarely, the AST node and source values that produced it.
/// The common case (`provenance: None`) costs one pointer-sized `None`;
/// only the handful of operators that read provenance (chiefly
/// `Precision`) ever look inside it.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub provenance: Option<Box<Provenance>>,
}

#[derive(Debug, Clone)]
pub struct Provenance {
    pub node: ExprId,
    /// The literal's exact source text, when this value came straight
    /// from a `Decimal` literal. Trailing zeros in here are the only way
    /// to recover `Precision`'s digit count.
    pub literal_text: Option<String>,
    pub sources: Vec<Value>,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Decimal(Decimal),
    String(String),
    Quantity { value: Decimal, unit: String },
    Date(CqlDate),
    DateTime(CqlDateTime),
    Time(CqlTime),
    Interval {
        low: Box<Value>,
        high: Box<Value>,
        low_inclusive: bool,
        high_inclusive: bool,
    },
    List { items: Vec<Value>, element_type: Type },
    Tuple(IndexMap<String, Value>),
    /// A data-model record drawn through the retriever or property
    /// access; opaque apart from its runtime type name.
    Named { handle: Arc<dyn ResourceHandle>, runtime_type: String },
    Code(Code),
    Concept { codes: SmallVec<[Code; 2]>, display: Option<String> },
    CodeSystem { id: String, version: Option<String> },
    ValueSet { id: String, version: Option<String> },
}

impl Value {
    pub fn null() -> Self {
        Self { kind: ValueKind::Null, provenance: None }
    }

    pub fn boolean(b: bool) -> Self {
        Self::bare(ValueKind::Boolean(b))
    }

    pub fn integer(i: i32) -> Self {
        Self::bare(ValueKind::Integer(i))
    }

    pub fn long(i: i64) -> Self {
        Self::bare(ValueKind::Long(i))
    }

    pub fn decimal(d: Decimal) -> Self {
        Self::bare(ValueKind::Decimal(d))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::bare(ValueKind::String(s.into()))
    }

    pub fn list(items: Vec<Value>, element_type: Type) -> Self {
        Self::bare(ValueKind::List { items, element_type })
    }

    fn bare(kind: ValueKind) -> Self {
        Self { kind, provenance: None }
    }

    /// Attaches provenance: the node that produced this value and the
    /// operand values it was computed from.
    pub fn with_sources(mut self, node: ExprId, sources: Vec<Value>) -> Self {
        self.provenance = Some(Box::new(Provenance { node, literal_text: None, sources }));
        self
    }

    /// Attaches a decimal literal's exact source text, so `Precision` can
    /// recover trailing-zero digit counts a binary float would lose.
    pub fn with_literal_text(mut self, node: ExprId, text: String) -> Self {
        self.provenance = Some(Box::new(Provenance { node, literal_text: Some(text), sources: vec![] }));
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn runtime_type(&self) -> Type {
        match &self.kind {
            ValueKind::Null => Type::Any,
            ValueKind::Boolean(_) => Type::Boolean,
            ValueKind::Integer(_) => Type::Integer,
            ValueKind::Long(_) => Type::Long,
            ValueKind::Decimal(_) => Type::Decimal,
            ValueKind::String(_) => Type::String,
            ValueKind::Quantity { .. } => Type::Quantity,
            ValueKind::Date(_) => Type::Date,
            ValueKind::DateTime(_) => Type::DateTime,
            ValueKind::Time(_) => Type::Time,
            ValueKind::Interval { low, .. } => Type::interval_of(low.runtime_type()),
            ValueKind::List { element_type, .. } => Type::list_of(element_type.clone()),
            ValueKind::Tuple(fields) => Type::Tuple(
                fields
                    .iter()
                    .map(|(name, v)| cql_ast::TupleTypeElement { name: name.clone(), element_type: v.runtime_type() })
                    .collect(),
            ),
            ValueKind::Named { runtime_type, .. } => Type::Named(runtime_type.clone()),
            ValueKind::Code(_) => Type::Code,
            ValueKind::Concept { .. } => Type::Concept,
            ValueKind::CodeSystem { .. } => Type::CodeSystem,
            ValueKind::ValueSet { .. } => Type::ValueSet,
        }
    }

    /// The type name used in dispatcher-failure messages, e.g.
    /// `"System.Integer"`.
    pub fn type_name(&self) -> String {
        self.runtime_type().to_string()
    }

    pub fn to_bool(&self) -> EvalResult<bool> {
        match self.kind {
            ValueKind::Boolean(b) => Ok(b),
            _ => Err(EvalError::TypeMismatch(format!("expected Boolean, found {}", self.type_name()))),
        }
    }

    pub fn to_int32(&self) -> EvalResult<i32> {
        match self.kind {
            ValueKind::Integer(i) => Ok(i),
            _ => Err(EvalError::TypeMismatch(format!("expected Integer, found {}", self.type_name()))),
        }
    }

    pub fn to_int64(&self) -> EvalResult<i64> {
        match self.kind {
            ValueKind::Long(i) => Ok(i),
            ValueKind::Integer(i) => Ok(i as i64),
            _ => Err(EvalError::TypeMismatch(format!("expected Long, found {}", self.type_name()))),
        }
    }

    pub fn to_decimal(&self) -> EvalResult<Decimal> {
        match &self.kind {
            ValueKind::Decimal(d) => Ok(*d),
            ValueKind::Integer(i) => Ok(Decimal::from(*i)),
            ValueKind::Long(i) => Ok(Decimal::from(*i)),
            _ => Err(EvalError::TypeMismatch(format!("expected a numeric value, found {}", self.type_name()))),
        }
    }

    pub fn to_str(&self) -> EvalResult<&str> {
        match &self.kind {
            ValueKind::String(s) => Ok(s),
            _ => Err(EvalError::TypeMismatch(format!("expected String, found {}", self.type_name()))),
        }
    }

    pub fn to_list(&self) -> EvalResult<&[Value]> {
        match &self.kind {
            ValueKind::List { items, .. } => Ok(items),
            _ => Err(EvalError::TypeMismatch(format!("expected List, found {}", self.type_name()))),
        }
    }

    pub fn to_quantity(&self) -> EvalResult<(Decimal, &str)> {
        match &self.kind {
            ValueKind::Quantity { value, unit } => Ok((*value, unit)),
            _ => Err(EvalError::TypeMismatch(format!("expected Quantity, found {}", self.type_name()))),
        }
    }

    /// Clamps a decimal to the CQL decimal range (spec.md §3.1); out of
    /// range collapses to Null rather than erroring.
    pub fn clamped_decimal(d: Decimal) -> Value {
        let max: Decimal = DECIMAL_MAX.parse().expect("DECIMAL_MAX parses");
        if d > max || d < -max {
            Value::null()
        } else {
            Value::decimal(d)
        }
    }

    /// CQL equality: null-aware (`Null = x` is Null), structural
    /// otherwise. Temporals compare at their declared precision via
    /// `compare_at_precision`.
    pub fn equal(&self, other: &Value) -> Value {
        if self.is_null() || other.is_null() {
            return Value::null();
        }
        match (&self.kind, &other.kind) {
            (ValueKind::Boolean(a), ValueKind::Boolean(b)) => Value::boolean(a == b),
            (ValueKind::Integer(a), ValueKind::Integer(b)) => Value::boolean(a == b),
            (ValueKind::Long(a), ValueKind::Long(b)) => Value::boolean(a == b),
            (ValueKind::Integer(a), ValueKind::Long(b)) | (ValueKind::Long(b), ValueKind::Integer(a)) => {
                Value::boolean(*a as i64 == *b)
            }
            (ValueKind::Decimal(a), ValueKind::Decimal(b)) => Value::boolean(a == b),
            (ValueKind::String(a), ValueKind::String(b)) => Value::boolean(a == b),
            (ValueKind::Quantity { value: av, unit: au }, ValueKind::Quantity { value: bv, unit: bu }) => {
                Value::boolean(au == bu && av == bv)
            }
            (ValueKind::Date(a), ValueKind::Date(b)) => a.compare_at_precision(b, a.precision.min(b.precision)).to_equal_value(),
            (ValueKind::DateTime(a), ValueKind::DateTime(b)) => {
                a.compare_at_precision(b, a.precision.min(b.precision)).to_equal_value()
            }
            (ValueKind::Time(a), ValueKind::Time(b)) => a.compare_at_precision(b, a.precision.min(b.precision)).to_equal_value(),
            (ValueKind::Code(a), ValueKind::Code(b)) => Value::boolean(a == b),
            (ValueKind::List { items: a, .. }, ValueKind::List { items: b, .. }) => {
                if a.len() != b.len() {
                    return Value::boolean(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.equal(y).kind {
                        ValueKind::Boolean(true) => continue,
                        _ => return Value::boolean(false),
                    }
                }
                Value::boolean(true)
            }
            (ValueKind::Tuple(a), ValueKind::Tuple(b)) => {
                if a.len() != b.len() {
                    return Value::boolean(false);
                }
                for (k, v) in a {
                    match b.get(k) {
                        Some(ov) => {
                            if !matches!(v.equal(ov).kind, ValueKind::Boolean(true)) {
                                return Value::boolean(false);
                            }
                        }
                        None => return Value::boolean(false),
                    }
                }
                Value::boolean(true)
            }
            _ => Value::boolean(false),
        }
    }

    /// Equivalence: like `equal` but total (Null equivalent Null is True,
    /// never Null itself).
    pub fn equivalent(&self, other: &Value) -> Value {
        if self.is_null() && other.is_null() {
            return Value::boolean(true);
        }
        if self.is_null() != other.is_null() {
            return Value::boolean(false);
        }
        match self.equal(other).kind {
            ValueKind::Boolean(b) => Value::boolean(b),
            _ => Value::boolean(false),
        }
    }
}
