//! Data models for reports, variable specs, results, and configuration.

pub mod config;
pub mod report;
pub mod result;
pub mod variable;

pub use config::StrokexConfig;
pub use report::ReportRecord;
pub use result::{Column, ExtractionRow, PendingRow, ResultSchema, VariableOutcome};
pub use variable::{VariableSet, VariableSpec};
