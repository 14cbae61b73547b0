//! Query and Retrieve AST nodes (spec.md §4.9, §4.4's Retrieve semantics).

use crate::expression::Expr;
use crate::types::SortDirection;

/// A query expression: one or more aliased sources, an optional `Let`,
/// `Where`, `Sort`, and `Return`.
#[derive(Debug, Clone)]
pub struct Query {
    pub sources: Vec<QuerySource>,
    pub lets: Vec<LetClause>,
    pub where_clause: Option<Box<Expr>>,
    pub return_clause: Option<ReturnClause>,
    pub sort: Option<SortClause>,
}

#[derive(Debug, Clone)]
pub struct QuerySource {
    pub alias: String,
    pub expression: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct LetClause {
    pub name: String,
    pub expression: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct ReturnClause {
    pub distinct: bool,
    pub expression: Box<Expr>,
}

#[derive(Debug, Clone)]
pub struct SortClause {
    pub items: Vec<SortItem>,
}

#[derive(Debug, Clone)]
pub struct SortItem {
    /// `None` sorts by the projected result itself.
    pub expression: Option<Box<Expr>>,
    pub direction: SortDirection,
}

/// `[ModelName.TypeName: CodeProperty in ValueSetRef]` — a primitive
/// expression that fetches domain resources of a given type, optionally
/// filtered by a value-set reference and a code-property path.
#[derive(Debug, Clone)]
pub struct Retrieve {
    pub model_name: String,
    pub model_version: String,
    /// The declared element type name (e.g. `"Observation"`).
    pub type_name: String,
    /// Path to the coded property being filtered (e.g. `"code"`).
    /// `Some` with an empty string and a non-null `value_set` is a malformed
    /// AST — see spec.md §6.5.
    pub code_property: Option<String>,
    /// Expression evaluating to the `ValueSet` to filter membership
    /// against.
    pub value_set: Option<Box<Expr>>,
}
