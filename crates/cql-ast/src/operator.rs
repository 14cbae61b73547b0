//! The closed set of operator kinds the dispatcher (`cql-eval::dispatch`)
//! resolves against runtime operand types (spec.md §4.5, §9 design note:
//! "the set of operator kinds is closed").
//!
//! `Convert` and `As`/`Is` are not represented here: they carry a target
//! `Type` rather than an operand-only signature, so they get their own
//! `ExprKind` variants instead of riding the generic `Operator` node.

/// A CQL operator node's identity. Arity is implied by how many operands
/// the enclosing `ExprKind::Operator` carries — the dispatcher does not
/// need a separate arity tag because the operand vector's length already
/// pins it down for a well-formed AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // --- Three-valued logic (spec.md §4.6.1) ---
    And,
    Or,
    Xor,
    Implies,
    Not,

    // --- Null-aware (spec.md §3.1 invariants) ---
    IsNull,
    IsTrue,
    IsFalse,
    Coalesce,

    // --- Arithmetic (spec.md §4.6.2) ---
    Add,
    Subtract,
    Multiply,
    TruncatedDivide,
    Divide,
    Modulo,
    Power,
    Abs,
    Negate,
    Ceiling,
    Floor,
    /// `Round(value[, precision])` — second operand optional.
    Round,
    Truncate,
    Exp,
    Ln,
    /// `Log(value, base)`.
    Log,
    Precision,
    /// `HighBoundary(value, precision)`.
    HighBoundary,
    /// `LowBoundary(value, precision)`.
    LowBoundary,
    Predecessor,
    Successor,

    // --- Comparison (spec.md §4.6.4 plus standard ordering ops) ---
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Before,
    After,
    SameAs,
    SameOrBefore,
    SameOrAfter,

    // --- Aggregates (spec.md §4.6.5) ---
    Count,
    AllTrue,
    AnyTrue,
    Sum,
    Avg,
    Min,
    Max,
    Median,
    GeometricMean,
    StdDev,
    Variance,
    PopulationStdDev,
    PopulationVariance,

    // --- Interval & list operators (spec.md §4.6.6) ---
    In,
    Contains,
    Overlaps,
    Starts,
    Ends,
    During,
    Union,
    Intersect,
    Except,
    Expand,
    Collapse,
    Indexer,
    First,
    Last,
    Exists,
    SingletonFrom,
    Tail,
    Take,
    Skip,
    IndexOf,
    Flatten,
    Distinct,
    Length,

    // --- String operators (spec.md §4.6.7) ---
    Concatenate,
    Combine,
    Split,
    Upper,
    Lower,
    StartsWith,
    EndsWith,
    Substring,
    PositionOf,
    LastPositionOf,
    Matches,
    ReplaceMatches,
}

impl Operator {
    /// The name used in dispatcher-failure messages, e.g.
    /// `"could not resolve Last(System.Integer)"` (spec.md §8 scenario 7).
    pub fn name(self) -> &'static str {
        match self {
            Operator::And => "And",
            Operator::Or => "Or",
            Operator::Xor => "Xor",
            Operator::Implies => "Implies",
            Operator::Not => "Not",
            Operator::IsNull => "IsNull",
            Operator::IsTrue => "IsTrue",
            Operator::IsFalse => "IsFalse",
            Operator::Coalesce => "Coalesce",
            Operator::Add => "Add",
            Operator::Subtract => "Subtract",
            Operator::Multiply => "Multiply",
            Operator::TruncatedDivide => "TruncatedDivide",
            Operator::Divide => "Divide",
            Operator::Modulo => "Modulo",
            Operator::Power => "Power",
            Operator::Abs => "Abs",
            Operator::Negate => "Negate",
            Operator::Ceiling => "Ceiling",
            Operator::Floor => "Floor",
            Operator::Round => "Round",
            Operator::Truncate => "Truncate",
            Operator::Exp => "Exp",
            Operator::Ln => "Ln",
            Operator::Log => "Log",
            Operator::Precision => "Precision",
            Operator::HighBoundary => "HighBoundary",
            Operator::LowBoundary => "LowBoundary",
            Operator::Predecessor => "Predecessor",
            Operator::Successor => "Successor",
            Operator::Equal => "Equal",
            Operator::NotEqual => "NotEqual",
            Operator::Equivalent => "Equivalent",
            Operator::NotEquivalent => "NotEquivalent",
            Operator::Less => "Less",
            Operator::Greater => "Greater",
            Operator::LessOrEqual => "LessOrEqual",
            Operator::GreaterOrEqual => "GreaterOrEqual",
            Operator::Before => "Before",
            Operator::After => "After",
            Operator::SameAs => "SameAs",
            Operator::SameOrBefore => "SameOrBefore",
            Operator::SameOrAfter => "SameOrAfter",
            Operator::Count => "Count",
            Operator::AllTrue => "AllTrue",
            Operator::AnyTrue => "AnyTrue",
            Operator::Sum => "Sum",
            Operator::Avg => "Avg",
            Operator::Min => "Min",
            Operator::Max => "Max",
            Operator::Median => "Median",
            Operator::GeometricMean => "GeometricMean",
            Operator::StdDev => "StdDev",
            Operator::Variance => "Variance",
            Operator::PopulationStdDev => "PopulationStdDev",
            Operator::PopulationVariance => "PopulationVariance",
            Operator::In => "In",
            Operator::Contains => "Contains",
            Operator::Overlaps => "Overlaps",
            Operator::Starts => "Starts",
            Operator::Ends => "Ends",
            Operator::During => "During",
            Operator::Union => "Union",
            Operator::Intersect => "Intersect",
            Operator::Except => "Except",
            Operator::Expand => "Expand",
            Operator::Collapse => "Collapse",
            Operator::Indexer => "Indexer",
            Operator::First => "First",
            Operator::Last => "Last",
            Operator::Exists => "Exists",
            Operator::SingletonFrom => "SingletonFrom",
            Operator::Tail => "Tail",
            Operator::Take => "Take",
            Operator::Skip => "Skip",
            Operator::IndexOf => "IndexOf",
            Operator::Flatten => "Flatten",
            Operator::Distinct => "Distinct",
            Operator::Length => "Length",
            Operator::Concatenate => "Concatenate",
            Operator::Combine => "Combine",
            Operator::Split => "Split",
            Operator::Upper => "Upper",
            Operator::Lower => "Lower",
            Operator::StartsWith => "StartsWith",
            Operator::EndsWith => "EndsWith",
            Operator::Substring => "Substring",
            Operator::PositionOf => "PositionOf",
            Operator::LastPositionOf => "LastPositionOf",
            Operator::Matches => "Matches",
            Operator::ReplaceMatches => "ReplaceMatches",
        }
    }

    /// Operators exempt from the universal null-propagation invariant
    /// (spec.md §3.1 / §8).
    pub fn is_null_aware(self) -> bool {
        matches!(
            self,
            Operator::And
                | Operator::Or
                | Operator::Xor
                | Operator::Implies
                | Operator::Not
                | Operator::IsNull
                | Operator::IsTrue
                | Operator::IsFalse
                | Operator::Coalesce
        )
    }
}
