//! Tabular input and output.

mod reader;
mod sink;

pub use reader::{
    is_workbook_path, load_reports, load_variables, read_reports, read_variables,
    read_workbook_reports, KEY_COLUMN,
};
pub use sink::{CsvFileSink, FileSink, ResultAccumulator, ResultSink, XlsxFileSink};
