//! External-collaborator interfaces for the CQL interpreter.
//!
//! The interpreter in `cql-eval` never constructs an AST, never parses CQL
//! text, and never knows how a patient resource is laid out on disk or over
//! the wire. It only knows the three seams described here:
//!
//! - [`DataModelRegistry`]: "what is the static type of property P of type
//!   T?" and "is type A a subtype of B?"
//! - [`Retriever`]: "give me every resource of type T."
//! - [`TerminologyProvider`]: "is this code in that value set?"
//!
//! This crate intentionally carries no FHIR model descriptors, no XML/JSON
//! model-info parsing, and no concrete retriever — those are left to
//! whoever embeds the interpreter.

mod code;
mod error;
mod registry;
mod retriever;
mod terminology;

pub use code::Code;
pub use error::{ModelError, RetrieverError, TerminologyError};
pub use registry::{DataModelRegistry, PropertyInfo, PropertyShape};
pub use retriever::{PropertyValue, ResourceHandle, Retriever};
pub use terminology::TerminologyProvider;
