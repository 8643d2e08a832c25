//! Core library for clinical variable extraction from stroke radiology reports.
//!
//! This crate provides:
//! - Report (CSV or workbook) and variable-spec table loading
//! - Prompt construction for each (report, variable) pair
//! - Final-answer normalization of free-text model responses
//! - The sequential extraction pipeline with a durable per-report flush

pub mod error;
pub mod extraction;
pub mod models;
pub mod table;

pub use error::{ConfigError, Result, SinkError, StrokexError};
pub use extraction::{
    build_prompt, extract_final_answer, ExtractionPipeline, NoopObserver, PipelineObserver,
    RunSummary, FALLBACK_RESPONSE, NO_ANSWER,
};
pub use models::{
    ExtractionRow, ReportRecord, ResultSchema, StrokexConfig, VariableOutcome, VariableSet,
    VariableSpec,
};
pub use table::{
    load_reports, load_variables, CsvFileSink, FileSink, ResultAccumulator, ResultSink,
    XlsxFileSink,
};

/// Re-export inference types.
pub use strokex_inference::{InferenceClient, InferenceError, OllamaClient};
