//! Error types for the external-collaborator boundary.

use thiserror::Error;

/// Failures raised by a [`crate::DataModelRegistry`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// `Using` named a data model the registry has no definition for.
    #[error("unknown data model: {name} {version}")]
    UnknownModel { name: String, version: String },

    /// A property lookup targeted a type the registry does not recognize.
    #[error("unknown type: {type_name}")]
    UnknownType { type_name: String },
}

/// Failures raised by a [`crate::Retriever`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrieverError {
    /// The retriever could not service the request (I/O, backend failure).
    #[error("retrieve failed for {data_type}: {message}")]
    Failed { data_type: String, message: String },
}

/// Failures raised by a [`crate::TerminologyProvider`] implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerminologyError {
    /// The value set or code system URL/version is not known to the
    /// terminology backend.
    #[error("unknown value set: {url} {version}")]
    UnknownValueSet { url: String, version: String },

    /// The terminology backend failed to answer (network, parse, etc).
    #[error("terminology lookup failed: {message}")]
    Failed { message: String },
}
