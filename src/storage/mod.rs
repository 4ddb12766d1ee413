//! File sinks for evaluation results.

pub mod csv;
pub mod jsonl;

// Re-export key types
pub use csv::{AGGREGATE_HEADERS, CsvPaths, CsvSink, SIZE_HEADERS, TIMES_HEADERS};
pub use jsonl::{JsonlSink, RunRecord};
