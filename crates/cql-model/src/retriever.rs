//! The retriever: an opaque producer of raw patient resources keyed by
//! resource type name, plus the record-reflection interface the
//! interpreter's property-access operator reads fields through.

use std::sync::Arc;

use crate::error::RetrieverError;

/// A single field read off a [`ResourceHandle`]. This is deliberately a
/// small, closed set: the interpreter's property-access operator (see
/// `cql-eval::property`) maps each variant onto the corresponding `Value`
/// variant, recursing into `Resource`/`List`.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    /// Raw textual form of a temporal wrapper (`FHIR.date`, `.dateTime`,
    /// `.time`); the interpreter's temporal engine parses it.
    Temporal(String),
    /// A nested named record.
    Resource(Arc<dyn ResourceHandle>),
    /// A repeating property.
    List(Vec<PropertyValue>),
}

/// An opaque handle to a single resource instance (e.g. one FHIR
/// `Observation`). The interpreter never assumes a concrete
/// representation — it reads fields exclusively through this trait.
pub trait ResourceHandle: Send + Sync + std::fmt::Debug {
    /// The resource's runtime type tag (e.g. `"Observation"`). `None` or
    /// empty is treated by the interpreter as `NoResourceType`.
    fn resource_type(&self) -> Option<&str>;

    /// Read `canonical_name` (already resolved through
    /// [`crate::DataModelRegistry::property`]) off this instance.
    fn get(&self, canonical_name: &str) -> Option<PropertyValue>;
}

/// Interface over a source of domain resources. Given a fully qualified
/// data-type name, returns every matching resource currently in scope
/// (e.g. for the evaluation's current patient context). Filtering by
/// value set or code path is the interpreter's job, performed after
/// retrieval, per spec.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, data_type_name: &str) -> Result<Vec<Arc<dyn ResourceHandle>>, RetrieverError>;
}
