//! Library structure AST nodes (spec.md §3.2, §4.3).

use crate::expression::Expr;
use crate::types::Type;

/// Public/private visibility on a definition (spec.md §3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A fully qualified library identity: name plus version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryId {
    pub name: String,
    pub version: String,
}

/// A complete CQL library (spec.md §3.2). `id` is `None` for an unnamed
/// library, which per the reference resolver invariant may not declare
/// parameters.
#[derive(Debug, Clone)]
pub struct Library {
    pub id: Option<LibraryId>,
    pub usings: Vec<UsingDef>,
    pub includes: Vec<IncludeDef>,
    pub parameters: Vec<ParameterDef>,
    pub code_systems: Vec<CodeSystemDef>,
    pub value_sets: Vec<ValueSetDef>,
    pub codes: Vec<CodeDef>,
    pub concepts: Vec<ConceptDef>,
    pub statements: Vec<Statement>,
}

/// `using ModelName version 'x.y'` — a data-model dependency, installed
/// into the data-model registry before anything else in the library runs.
#[derive(Debug, Clone)]
pub struct UsingDef {
    pub model_name: String,
    pub model_version: String,
}

/// `include OtherLibrary version 'x.y' called Alias` — makes another
/// library's public definitions visible under a local alias.
#[derive(Debug, Clone)]
pub struct IncludeDef {
    pub library_name: String,
    pub library_version: String,
    pub alias: String,
}

#[derive(Debug, Clone)]
pub struct ParameterDef {
    pub visibility: Visibility,
    pub name: String,
    pub parameter_type: Type,
    /// Evaluated only if the caller did not supply a binding for this
    /// parameter (spec.md §4.3 step 2).
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct CodeSystemDef {
    pub visibility: Visibility,
    pub name: String,
    pub uri: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValueSetDef {
    pub visibility: Visibility,
    pub name: String,
    pub uri: String,
    pub version: Option<String>,
    /// Names of `CodeSystemDef`s this value set declares membership
    /// against; resolved in the same library.
    pub code_system_refs: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CodeDef {
    pub visibility: Visibility,
    pub name: String,
    pub code: String,
    /// Name of the `CodeSystemDef` this code belongs to; must resolve to a
    /// non-null code system (spec.md §4.3 step 3).
    pub code_system_ref: String,
    pub display: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConceptDef {
    pub visibility: Visibility,
    pub name: String,
    pub code_refs: Vec<String>,
    pub display: Option<String>,
}

/// A top-level statement: either an eagerly evaluated expression
/// definition or an uninvoked function definition.
#[derive(Debug, Clone)]
pub enum Statement {
    Expression(ExpressionDef),
    Function(FunctionDef),
}

#[derive(Debug, Clone)]
pub struct ExpressionDef {
    pub visibility: Visibility,
    pub name: String,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub visibility: Visibility,
    pub fluent: bool,
    pub name: String,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Type,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct FunctionParameter {
    pub name: String,
    pub parameter_type: Type,
}
