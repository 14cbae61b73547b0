//! The terminology provider: opaque resolver of value-set / code-system
//! membership. Value sets are identified by URL + version (spec §6.5).

use crate::code::Code;
use crate::error::TerminologyError;

pub trait TerminologyProvider: Send + Sync {
    /// Whether `code` is a member of the value set identified by
    /// `value_set_url` (+ optional `version`).
    fn in_value_set(
        &self,
        code: &Code,
        value_set_url: &str,
        version: Option<&str>,
    ) -> Result<bool, TerminologyError>;

    /// The full membership of the value set identified by
    /// `value_set_url` (+ optional `version`).
    fn expand(&self, value_set_url: &str, version: Option<&str>) -> Result<Vec<Code>, TerminologyError>;
}
