//! Spreadsheet input: the attribute mapping and the source extracts

pub mod mapping;
pub mod source;

pub use mapping::{MappingError, read_declarations};
pub use source::{Cell, SourceRow, read_source_sheet};
