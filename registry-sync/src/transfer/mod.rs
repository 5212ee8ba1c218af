//! Spreadsheet to registry reconciliation
//!
//! Source extracts are read and prepared per mode, normalized into records,
//! diffed against what the registry holds, and written back through the
//! gateway one category at a time.

pub mod codec;
pub mod engine;
pub mod excel;
pub mod files;
pub mod hierarchy;
pub mod modes;
pub mod normalizer;
pub mod pipeline;
pub mod types;

pub use modes::Mode;
pub use pipeline::{CategoryOutcome, CategoryReport, RunSummary, Synchronizer};
