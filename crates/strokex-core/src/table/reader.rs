//! Readers for the report and variable-spec tables.
//!
//! Reports come from CSV or from the first worksheet of a spreadsheet
//! workbook, chosen by file extension. Variable specs are always CSV.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::info;

use crate::error::{ConfigError, Result, StrokexError};
use crate::models::config::InputConfig;
use crate::models::{ReportRecord, VariableSet, VariableSpec};

/// Required key column of the variable-spec table.
pub const KEY_COLUMN: &str = "key";

const QUESTION_COLUMN: &str = "question";
const ANSWER_CHOICES_COLUMN: &str = "answer_choices";
const FINAL_OUTPUT_COLUMN: &str = "final_output";
const COT_COLUMN: &str = "cot";

/// Extensions read as spreadsheet workbooks instead of CSV.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
}

fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn required_column(headers: &[String], table: &'static str, name: &str) -> Result<usize> {
    column_index(headers, name).ok_or_else(|| {
        ConfigError::MissingColumn {
            table,
            column: name.to_string(),
        }
        .into()
    })
}

fn cell(record: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| record.get(i))
        .cloned()
        .unwrap_or_default()
}

fn string_record(record: &csv::StringRecord) -> Vec<String> {
    record.iter().map(String::from).collect()
}

/// Whether `path` names a spreadsheet workbook.
pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|w| ext.eq_ignore_ascii_case(w))
        })
}

/// Load report records from a CSV file or a spreadsheet workbook.
pub fn load_reports(path: &Path, columns: &InputConfig) -> Result<Vec<ReportRecord>> {
    let reports = if is_workbook_path(path) {
        read_workbook_reports(path, columns)?
    } else {
        read_reports(File::open(path)?, columns)?
    };
    info!("Loaded {} reports from {}", reports.len(), path.display());
    Ok(reports)
}

/// Read report records from CSV data.
///
/// The identifier and report-text columns named in `columns` must all be
/// present in the header. Short rows read their missing cells as empty.
pub fn read_reports<R: Read>(reader: R, columns: &InputConfig) -> Result<Vec<ReportRecord>> {
    let mut rdr = csv_reader(reader);
    let headers = string_record(rdr.headers()?);

    let rows = rdr
        .records()
        .map(|record| record.map(|r| string_record(&r)).map_err(StrokexError::from));
    collect_reports(&headers, rows, columns)
}

/// Read report records from the first worksheet of a workbook.
///
/// The first row is the header. Whole-number cells read without a decimal
/// part, so numeric identifiers come through as `"100"` rather than `"100.0"`.
pub fn read_workbook_reports(path: &Path, columns: &InputConfig) -> Result<Vec<ReportRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ConfigError::NoWorksheet(path.display().to_string()))??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(workbook_cell).collect())
        .unwrap_or_default();

    collect_reports(&headers, rows.map(workbook_row), columns)
}

fn workbook_row(row: &[Data]) -> Result<Vec<String>> {
    Ok(row.iter().map(workbook_cell).collect())
}

fn workbook_cell(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn collect_reports<I>(headers: &[String], rows: I, columns: &InputConfig) -> Result<Vec<ReportRecord>>
where
    I: IntoIterator<Item = Result<Vec<String>>>,
{
    let patient = required_column(headers, "report", &columns.patient_id_column)?;
    let accession = required_column(headers, "report", &columns.accession_column)?;
    let text = required_column(headers, "report", &columns.report_text_column)?;

    let mut reports = Vec::new();
    for record in rows {
        let record = record?;
        reports.push(ReportRecord {
            patient_id: cell(&record, Some(patient)),
            accession_number: cell(&record, Some(accession)),
            report_text: cell(&record, Some(text)),
        });
    }

    Ok(reports)
}

/// Load and validate variable specs from a CSV file.
pub fn load_variables(path: &Path) -> Result<VariableSet> {
    let variables = read_variables(File::open(path)?)?;
    info!("Loaded {} variable specs from {}", variables.len(), path.display());
    Ok(variables)
}

/// Read and validate variable specs from CSV data.
///
/// Only the `key` column is required. `question`, `answer_choices` and
/// `final_output` read as empty when absent. `cot` is `None` on every spec
/// when the column is absent, and `Some` (possibly empty) when present.
pub fn read_variables<R: Read>(reader: R) -> Result<VariableSet> {
    let mut rdr = csv_reader(reader);
    let headers = string_record(rdr.headers()?);

    let key = required_column(&headers, "variable", KEY_COLUMN)?;
    let question = column_index(&headers, QUESTION_COLUMN);
    let answer_choices = column_index(&headers, ANSWER_CHOICES_COLUMN);
    let final_output = column_index(&headers, FINAL_OUTPUT_COLUMN);
    let cot = column_index(&headers, COT_COLUMN);

    let mut specs = Vec::new();
    for record in rdr.records() {
        let record = string_record(&record?);
        specs.push(VariableSpec {
            key: cell(&record, Some(key)),
            question: cell(&record, question),
            answer_choices: cell(&record, answer_choices),
            final_output: cell(&record, final_output),
            cot: cot.map(|i| cell(&record, Some(i))),
        });
    }

    Ok(VariableSet::new(specs)?)
}
