//! The wire shape a [`crate::Retriever`] and [`crate::TerminologyProvider`]
//! exchange with the interpreter. `cql-eval`'s `Value::Code` variant is
//! built from this, rather than the other way around, so this crate never
//! depends on the interpreter's value model.

/// A single code drawn from a code system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub code: String,
    pub system: Option<String>,
    pub version: Option<String>,
    pub display: Option<String>,
}

impl Code {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: None,
            version: None,
            display: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}
