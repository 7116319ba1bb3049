//! Field extraction and record assembly
//!
//! Extraction is a pure function of a parsed document and a rule: it never
//! fails past its boundary, recording a [`FieldValue::Missing`] instead.
//! Assembly combines the per-field values of one document into a [`Record`]
//! and decides whether that record is complete.

mod field;
mod record;

pub use field::{extract, extract_all, ExtractionResult, FieldValue};
pub use record::{assemble, Completeness, GroupRecord, Record};
