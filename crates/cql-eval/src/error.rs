//! The fixed error taxonomy every evaluation path returns into.

use thiserror::Error;

pub type EvalResult<T> = Result<T, EvalError>;

/// One evaluation failure. Every operator, the resolver, the query
/// evaluator, and the retrieve path all return through this type; the
/// library boundary wraps whichever variant fires into an `EngineError`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// A required AST child was absent, or a literal used an unsupported
    /// textual layout.
    #[error("malformed AST: {0}")]
    AstMalformed(String),

    /// A value of the wrong runtime variant reached a converter, or a
    /// `Where` clause evaluated to something other than Boolean.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// An unresolved name, missing include, or unknown data model.
    #[error("not found: {0}")]
    NotFound(String),

    /// A cross-library reference to a private definition.
    #[error("{0} is not public")]
    Visibility(String),

    /// An operator was asked to run at a precision it does not support.
    #[error("invalid precision: {0}")]
    InvalidPrecision(String),

    /// The dispatcher had no implementation for this operator/operand
    /// combination.
    #[error("could not resolve {0}")]
    UnsupportedOverload(String),

    /// Quantity arithmetic across incompatible units.
    #[error("unsupported unit conversion: {0}")]
    UnsupportedUnitConversion(String),

    /// A spec'd hard failure rather than a Null result (negative `Round`
    /// precision, certain `Exp`/`Ln` domain violations).
    #[error("domain error: {0}")]
    DomainError(String),

    /// `Convert` asked for a conversion the fixed table does not define.
    #[error("unsupported conversion: {0}")]
    UnsupportedConversion(String),

    /// The retriever or terminology provider failed.
    #[error("retrieve error: {0}")]
    RetrieveError(String),

    /// An invariant a well-formed AST should have guaranteed was
    /// violated — an interpreter bug, not a user error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Cooperative cancellation observed at a statement or iteration
    /// boundary.
    #[error("evaluation cancelled")]
    Cancelled,

    /// A `Message` node with severity `Error` ran.
    #[error("{0}")]
    LoggedError(String),
}

/// The library-boundary wrapper: every `EvalError` that escapes a
/// library's evaluation is stamped with that library's identity once,
/// here, so callers see `<library-key>: <kind>: <message>`.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{library_key}: {kind}: {source}")]
pub struct EngineError {
    pub library_key: String,
    pub kind: &'static str,
    pub source: EvalError,
}

impl EngineError {
    pub fn new(library_key: impl Into<String>, source: EvalError) -> Self {
        let kind = source.kind();
        Self { library_key: library_key.into(), kind, source }
    }
}

impl EvalError {
    /// The taxonomy tag used in `EngineError`'s rendering and in log
    /// records.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::AstMalformed(_) => "AstMalformed",
            EvalError::TypeMismatch(_) => "TypeMismatch",
            EvalError::NotFound(_) => "NotFound",
            EvalError::Visibility(_) => "Visibility",
            EvalError::InvalidPrecision(_) => "InvalidPrecision",
            EvalError::UnsupportedOverload(_) => "UnsupportedOverload",
            EvalError::UnsupportedUnitConversion(_) => "UnsupportedUnitConversion",
            EvalError::DomainError(_) => "DomainError",
            EvalError::UnsupportedConversion(_) => "UnsupportedConversion",
            EvalError::RetrieveError(_) => "RetrieveError",
            EvalError::Internal(_) => "Internal",
            EvalError::Cancelled => "Cancelled",
            EvalError::LoggedError(_) => "LoggedError",
        }
    }
}
