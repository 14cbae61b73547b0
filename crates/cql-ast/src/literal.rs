//! Literal AST nodes.
//!
//! Temporal and decimal literals carry their original textual form
//! alongside the parsed value: the interpreter's temporal engine parses
//! the text itself to compute precision (spec.md §4.4), and decimal
//! precision provenance (spec.md §4.6.2) is recovered from the text when a
//! `Decimal` literal feeds straight into `Precision(...)`.

use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    /// `text` is the literal exactly as written, e.g. `"1.500"` for a
    /// value of `1.5` — trailing zeros in the source are the only way to
    /// recover CQL's `Precision(1.500) = 3`.
    Decimal { value: Decimal, text: String },
    String(String),
    /// Quantity literal: a decimal magnitude plus a UCUM unit string.
    Quantity { value: Decimal, text: String, unit: String },
    /// Raw text after the leading `@`, e.g. `"2024-03-15"` or
    /// `"2024-03"`. Not yet parsed into components or precision.
    Date(String),
    /// Raw text after the leading `@`, e.g.
    /// `"2024-03-15T10:30:00.000-05:00"`.
    DateTime(String),
    /// Raw text after the leading `@T`, e.g. `"10:30:00.000"`.
    Time(String),
}
