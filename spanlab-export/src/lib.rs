//! Result export: CSV and JSON renderings of a trial log, and the
//! file-writing sinks the engine hands its log to.

pub mod document;
pub mod error;
pub mod sink;
pub mod table;

pub use document::{ExportDocument, from_json, to_json};
pub use error::ExportError;
pub use sink::{CsvFileSink, JsonFileSink, OutputTarget, sanitize_id};
pub use table::{Column, CsvLayout, SummaryPlacement, escape_field, summary_line, to_csv};
