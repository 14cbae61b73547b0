//! The operator dispatcher: resolves an `Operator` node to an
//! implementation by operand runtime variant, via a static table rather
//! than virtual dispatch (spec.md §4.5, §9).

use std::collections::HashMap;
use std::fmt;

use cql_ast::{Operator, TemporalPrecision};
use once_cell::sync::Lazy;

use crate::error::{EvalError, EvalResult};
use crate::value::{Value, ValueKind};

/// The coarse runtime shape of an operand, used as the dispatch table's
/// key component. `Null` is a legitimate tag: the dispatcher does not
/// short-circuit nulls (§4.5), so a Null operand must still select an
/// overload — it does so as a wildcard (see `lookup`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandTag {
    Null,
    Boolean,
    Integer,
    Long,
    Decimal,
    String,
    Quantity,
    Date,
    DateTime,
    Time,
    Interval,
    List,
    Tuple,
    Named,
    Code,
    Concept,
    CodeSystem,
    ValueSet,
}

impl fmt::Display for OperandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperandTag::Null => "Null",
            OperandTag::Boolean => "System.Boolean",
            OperandTag::Integer => "System.Integer",
            OperandTag::Long => "System.Long",
            OperandTag::Decimal => "System.Decimal",
            OperandTag::String => "System.String",
            OperandTag::Quantity => "System.Quantity",
            OperandTag::Date => "System.Date",
            OperandTag::DateTime => "System.DateTime",
            OperandTag::Time => "System.Time",
            OperandTag::Interval => "Interval",
            OperandTag::List => "List",
            OperandTag::Tuple => "Tuple",
            OperandTag::Named => "Named",
            OperandTag::Code => "System.Code",
            OperandTag::Concept => "System.Concept",
            OperandTag::CodeSystem => "System.CodeSystem",
            OperandTag::ValueSet => "System.ValueSet",
        };
        write!(f, "{s}")
    }
}

pub fn tag_of(value: &Value) -> OperandTag {
    match &value.kind {
        ValueKind::Null => OperandTag::Null,
        ValueKind::Boolean(_) => OperandTag::Boolean,
        ValueKind::Integer(_) => OperandTag::Integer,
        ValueKind::Long(_) => OperandTag::Long,
        ValueKind::Decimal(_) => OperandTag::Decimal,
        ValueKind::String(_) => OperandTag::String,
        ValueKind::Quantity { .. } => OperandTag::Quantity,
        ValueKind::Date(_) => OperandTag::Date,
        ValueKind::DateTime(_) => OperandTag::DateTime,
        ValueKind::Time(_) => OperandTag::Time,
        ValueKind::Interval { .. } => OperandTag::Interval,
        ValueKind::List { .. } => OperandTag::List,
        ValueKind::Tuple(_) => OperandTag::Tuple,
        ValueKind::Named { .. } => OperandTag::Named,
        ValueKind::Code(_) => OperandTag::Code,
        ValueKind::Concept { .. } => OperandTag::Concept,
        ValueKind::CodeSystem { .. } => OperandTag::CodeSystem,
        ValueKind::ValueSet { .. } => OperandTag::ValueSet,
    }
}

/// An operator implementation: the dispatched operands (in AST order)
/// plus the call's precision qualifier, if any.
pub type OperatorFn = fn(&[Value], Option<TemporalPrecision>) -> EvalResult<Value>;

#[derive(Clone)]
pub struct Registration {
    pub tags: Vec<OperandTag>,
    pub function: OperatorFn,
}

pub struct DispatchTable {
    entries: HashMap<Operator, Vec<Registration>>,
}

impl DispatchTable {
    fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn register(&mut self, op: Operator, tags: &[OperandTag], function: OperatorFn) {
        self.entries.entry(op).or_default().push(Registration { tags: tags.to_vec(), function });
    }

    /// Finds the implementation matching `op` and the given operand
    /// tags. `Null` is a wildcard on either side: a registered `Null`
    /// slot accepts any actual operand (used by operators like
    /// `Coalesce`/`IsNull` that work over every variant), and an actual
    /// `Null` operand matches whatever concrete signature is registered
    /// at that position (letting one typed registration also cover the
    /// null-propagating case — the implementation itself decides what a
    /// Null operand means).
    fn lookup(&self, op: Operator, tags: &[OperandTag]) -> Option<OperatorFn> {
        let candidates = self.entries.get(&op)?;
        candidates
            .iter()
            .find(|reg| {
                reg.tags.len() == tags.len()
                    && reg.tags.iter().zip(tags.iter()).all(|(expected, actual)| {
                        expected == actual || *actual == OperandTag::Null || *expected == OperandTag::Null
                    })
            })
            .map(|reg| reg.function)
    }
}

static TABLE: Lazy<DispatchTable> = Lazy::new(|| {
    let mut table = DispatchTable::new();
    crate::operators::logical::register(&mut table);
    crate::operators::arithmetic::register(&mut table);
    crate::operators::comparison::register(&mut table);
    crate::operators::datetime::register(&mut table);
    crate::operators::aggregate::register(&mut table);
    crate::operators::list::register(&mut table);
    crate::operators::interval::register(&mut table);
    crate::operators::string::register(&mut table);
    crate::operators::type_ops::register(&mut table);
    table
});

/// Dispatches `op` against already-evaluated `operands`, per spec.md
/// §4.5. Fails `UnsupportedOverload` when no registration matches.
pub fn dispatch(op: Operator, operands: &[Value], precision: Option<TemporalPrecision>) -> EvalResult<Value> {
    let tags: Vec<OperandTag> = operands.iter().map(tag_of).collect();
    match TABLE.lookup(op, &tags) {
        Some(function) => function(operands, precision),
        None => {
            let rendered: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
            Err(EvalError::UnsupportedOverload(format!("{}({})", op.name(), rendered.join(", "))))
        }
    }
}
