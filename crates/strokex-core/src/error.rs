//! Error types for the strokex-core library.

use thiserror::Error;

/// Main error type for the strokex library.
#[derive(Error, Debug)]
pub enum StrokexError {
    /// Configuration error, raised before any report is processed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Result sink error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// CSV decoding error while reading an input table.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet decoding error while reading a report workbook.
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal input and schema problems detected at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required column is absent from an input table header.
    #[error("{table} table must contain a '{column}' column")]
    MissingColumn { table: &'static str, column: String },

    /// Two variable specs share the same key.
    #[error("duplicate variable key: {0}")]
    DuplicateKey(String),

    /// A variable spec row has an empty key.
    #[error("variable spec row {row} has an empty key")]
    EmptyKey { row: usize },

    /// Reasoning mode needs a worked example for every variable.
    #[error("reasoning mode requires a 'cot' column in the variable table")]
    MissingCot,

    /// Two output columns would have the same name.
    #[error("output column '{0}' would appear more than once")]
    ColumnCollision(String),

    /// The output schema was built for different variables or mode.
    #[error("output schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A report workbook contains no worksheet to read.
    #[error("workbook {0} has no worksheets")]
    NoWorksheet(String),

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration file: {0}")]
    File(String),
}

/// Errors raised while persisting the result table.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Failed to create or write the staging file.
    #[error("failed to write results: {0}")]
    Write(#[from] std::io::Error),

    /// Failed to encode a row as CSV.
    #[error("failed to encode results: {0}")]
    Encode(#[from] csv::Error),

    /// Failed to build the result workbook.
    #[error("failed to encode workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// Failed to move the staging file over the destination.
    #[error("failed to replace {path}: {reason}")]
    Persist { path: String, reason: String },
}

/// Result type for the strokex library.
pub type Result<T> = std::result::Result<T, StrokexError>;
