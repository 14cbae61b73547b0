//! The expression node shapes the interpreter walks (spec.md §4.4, §6.3,
//! §9 design note: "a tagged enum of node kinds plus shared arity and
//! result_type accessors").

use crate::literal::Literal;
use crate::operator::Operator;
use crate::query::{Query, Retrieve};
use crate::types::{TemporalPrecision, Type};

/// Node identity, assigned by whoever builds the AST (the parser, in a
/// full pipeline; test fixtures in this crate's own tests). Used as the
/// provenance key in `cql-eval::value`.
pub type ExprId = u32;

/// A single AST node: identity, declared result type, and kind-specific
/// children. The interpreter reads `result_type` but never writes it.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: ExprId,
    pub result_type: Type,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(id: ExprId, result_type: Type, kind: ExprKind) -> Self {
        Self { id, result_type, kind }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),

    /// An unqualified name lookup: a local (query alias, `Let` binding,
    /// function parameter) or a same-library definition.
    Ref(String),

    /// `Alias.Name` — a reference into an included library via its local
    /// alias.
    QualifiedRef { library_alias: String, name: String },

    /// `source.property`.
    Property { source: Box<Expr>, path: String },

    /// One operator node from the closed `Operator` set, plus its
    /// operands in the order the operator's signature expects and, for
    /// the operators spec.md §4.6.4/§4.6.6 qualify with a precision, the
    /// precision named on the call.
    Operator {
        op: Operator,
        operands: Vec<Expr>,
        precision: Option<TemporalPrecision>,
    },

    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    Case {
        comparand: Option<Box<Expr>>,
        items: Vec<CaseItem>,
        else_result: Box<Expr>,
    },

    List {
        elements: Vec<Expr>,
        element_type: Type,
    },

    Tuple {
        fields: Vec<(String, Expr)>,
    },

    /// `TypeName { field: value, ... }`.
    Instance {
        type_name: String,
        fields: Vec<(String, Expr)>,
    },

    Interval {
        low: Box<Expr>,
        high: Box<Expr>,
        low_inclusive: bool,
        high_inclusive: bool,
    },

    /// `source.low` / `.high` / `.lowClosed` / `.highClosed`, expressed as
    /// a dedicated node because they read Interval fields directly rather
    /// than going through named-record property resolution.
    IntervalField { source: Box<Expr>, field: IntervalField },

    /// Invocation of a library-level function (same-library, or
    /// cross-library when `library_alias` is set).
    FunctionRef {
        library_alias: Option<String>,
        name: String,
        args: Vec<Expr>,
    },

    Query(Box<Query>),
    Retrieve(Box<Retrieve>),

    Message {
        source: Box<Expr>,
        condition: Option<Box<Expr>>,
        code: Option<Box<Expr>>,
        severity: MessageSeverity,
        message: Box<Expr>,
    },

    Now,
    Today,
    TimeOfDay,

    MinValue(Type),
    MaxValue(Type),

    Is { source: Box<Expr>, target_type: Type },
    As { source: Box<Expr>, target_type: Type, strict: bool },

    /// `Convert(source as TargetType)` — a fixed-table runtime conversion,
    /// distinct from `As` because it can actually transform the value
    /// (e.g. `Integer` to `Decimal`) rather than merely re-tag it.
    Convert { source: Box<Expr>, target_type: Type },
}

#[derive(Debug, Clone)]
pub struct CaseItem {
    pub when: Expr,
    pub then: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalField {
    Low,
    High,
    LowClosed,
    HighClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Trace,
    Message,
    Warning,
    Error,
}
