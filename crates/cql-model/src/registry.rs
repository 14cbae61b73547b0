//! The data-model registry: answers "what is the static type of property P
//! of type T?" and "is type A a subtype of B?". The interpreter never
//! embeds a data-model description itself (no FHIR XML/JSON blobs here);
//! it only ever asks a registry implementation these two questions plus a
//! JSON-name to canonical-name mapping for record reflection.

/// The shape of a named record's property, as the registry reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyShape {
    /// A single value of the given canonical type name.
    Scalar(String),
    /// A repeating value; `List` carries the element type name.
    List(String),
    /// A oneof/choice property. Each entry is `(JsonDiscriminant,
    /// TypeName)` — e.g. `("valueQuantity", "Quantity")`,
    /// `("valueCodeableConcept", "CodeableConcept")`.
    Choice(Vec<(String, String)>),
}

/// Everything the interpreter needs to know about a named record's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// The canonical (data-model) field name, as opposed to the
    /// possibly-different JSON wire name used to look it up.
    pub canonical_name: String,
    pub shape: PropertyShape,
}

/// Interface over a data model (e.g. "FHIR 4.0.1") the interpreter consults
/// for property resolution and subtype checks. Implementations are free to
/// back this with an embedded model-info descriptor, a runtime schema
/// fetch, or a hand-rolled table in tests.
pub trait DataModelRegistry: Send + Sync {
    /// The canonical URI for a named data model, used to validate a
    /// `Retrieve` node's declared model against the library's `Using`
    /// declarations.
    fn model_uri(&self, model_name: &str, model_version: &str) -> Option<String>;

    /// Resolve `property` (given in whatever casing the AST carries —
    /// typically the JSON wire name) on `type_name` to its canonical shape.
    /// Returns `None` when the type has no such property.
    fn property(&self, type_name: &str, property: &str) -> Option<PropertyInfo>;

    /// Whether `sub` is `sup`, or derives from it, in this data model's
    /// type hierarchy. Every type is a subtype of itself.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool;

    /// Whether `type_name` is directly retrievable (i.e. a valid
    /// `[TypeName]` retrieve target).
    fn is_retrievable(&self, type_name: &str) -> bool;
}
